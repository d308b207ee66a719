// ==========================================
// 人事薪资后台 - 期间删除流程
// ==========================================
// 职责: 密码确认后删除某记录类型在某期间的全部数据，并追加 Delete 历史
// 复用: 导入冲突确认与独立删除共用此流程
// ==========================================

use crate::app::session::{SessionUser, DELETE_PERMISSION};
use crate::domain::history::HistoryEntry;
use crate::domain::session::TargetPeriod;
use crate::domain::types::{HistoryAction, HistoryKind, PasswordErrorKind, RecordKind};
use crate::engine::history_log::HistoryLog;
use crate::engine::password_gate::{PasswordGate, PasswordOutcome};
use crate::engine::reconciliation::ReconciliationEngine;
use crate::importer::error::{ImportError, ImportResult};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted {
        count: usize,
        /// 数据已删除但历史追加失败时的错误信息
        history_error: Option<String>,
    },
    Rejected {
        kind: PasswordErrorKind,
        remaining: u8,
    },
    /// 尝试次数耗尽，流程作废
    Aborted,
}

/// 历史表标签（如 "payroll Ref. 03/2025"）
pub fn period_label(kind: RecordKind, target: &TargetPeriod) -> String {
    format!("{} Ref. {}", kind.collection(), target.reference_label())
}

pub struct PeriodDeleteFlow {
    kind: RecordKind,
    target: TargetPeriod,
    file_name: String,
    history_kind: HistoryKind,
    gate: PasswordGate,
    reconciliation: Arc<ReconciliationEngine>,
    history: Arc<HistoryLog>,
    finished: bool,
}

impl PeriodDeleteFlow {
    /// # 参数
    /// - file_name: 写入历史的来源文件名（独立删除时可为空）
    /// - history_kind: 冲突确认为 SYSTEM，独立删除为 manual
    pub fn new(
        kind: RecordKind,
        target: TargetPeriod,
        file_name: &str,
        history_kind: HistoryKind,
        max_attempts: u8,
        reconciliation: Arc<ReconciliationEngine>,
        history: Arc<HistoryLog>,
    ) -> Self {
        Self {
            kind,
            target,
            file_name: file_name.to_string(),
            history_kind,
            gate: PasswordGate::new(max_attempts),
            reconciliation,
            history,
            finished: false,
        }
    }

    pub fn target(&self) -> &TargetPeriod {
        &self.target
    }

    pub fn attempts(&self) -> u8 {
        self.gate.attempts()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 提交密码
    #[instrument(skip(self, password, user), fields(kind = %self.kind, period = %self.target.key()))]
    pub async fn confirm(
        &mut self,
        password: &str,
        user: &SessionUser,
    ) -> ImportResult<DeleteOutcome> {
        if self.finished {
            return Ok(DeleteOutcome::Aborted);
        }
        // 独立删除需 delete 权限；冲突确认随导入授权
        if self.history_kind == HistoryKind::Manual && !user.has_permission(DELETE_PERMISSION) {
            warn!(user = %user.id, "缺少删除权限");
            return Err(ImportError::PermissionDenied(DELETE_PERMISSION.to_string()));
        }

        match self.gate.verify(user, password) {
            PasswordOutcome::Rejected { kind, remaining } => {
                Ok(DeleteOutcome::Rejected { kind, remaining })
            }
            PasswordOutcome::Exhausted => {
                self.finished = true;
                warn!("密码尝试次数耗尽，删除流程作废");
                Ok(DeleteOutcome::Aborted)
            }
            PasswordOutcome::Accepted => {
                let count = self.reconciliation.delete_period(self.kind, &self.target).await?;
                self.finished = true;

                let entry = HistoryEntry::new(
                    period_label(self.kind, &self.target),
                    HistoryAction::Delete,
                    self.file_name.clone(),
                    user.display_name.clone(),
                    self.history_kind,
                );
                let history_error = match self.history.append(entry).await {
                    Ok(_) => None,
                    Err(e) => {
                        warn!(error = %e, "删除已完成，但历史记录追加失败");
                        Some(e.to_string())
                    }
                };

                info!(count, "期间删除完成");
                Ok(DeleteOutcome::Deleted {
                    count,
                    history_error,
                })
            }
        }
    }
}
