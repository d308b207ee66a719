// ==========================================
// 人事薪资后台 - 导入状态机
// ==========================================
// 状态: idle → validating → uploading → {done | error}
// 分支: 期间冲突暂停（只能经密码确认或取消离开）
// 红线: 不自动重试；远程失败即本次尝试终止
// ==========================================

use crate::app::notification::NotificationSink;
use crate::app::session::SessionStore;
use crate::config::ImportSettings;
use crate::domain::employee::EmployeeRecord;
use crate::domain::history::HistoryEntry;
use crate::domain::session::{ImportSession, PeriodConflict, StatusMessage, TargetPeriod};
use crate::domain::types::{HistoryAction, HistoryKind, ImportStatus, PasswordErrorKind, RecordKind};
use crate::engine::history_log::HistoryLog;
use crate::engine::period_delete::{period_label, DeleteOutcome, PeriodDeleteFlow};
use crate::engine::reconciliation::{
    cross_reference, partition_by_registration, Partition, ReconciliationEngine,
};
use crate::engine::strategy::{strategy_for, PreparedBatch};
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::repository::record_store::{to_row, Filter, RecordStore};
use crate::repository::error::RepositoryResult;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// ===== 进度刻度 =====
const PROGRESS_PARSED: u8 = 20;
const PROGRESS_VALIDATED: u8 = 30;
const PROGRESS_RECONCILED: u8 = 50;
const PROGRESS_WRITTEN: u8 = 90;

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub kind: RecordKind,
    pub inserts: usize,
    pub updates: usize,
    /// 冲突确认时删除的旧记录数
    pub deleted: usize,
    /// 数据已写入但历史追加失败
    pub history_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Committed(CommitSummary),
    ConflictPending(PeriodConflict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictOutcome {
    Committed(CommitSummary),
    Retry {
        kind: PasswordErrorKind,
        remaining: u8,
    },
    /// 尝试次数耗尽，会话转为 error
    Aborted,
}

// ==========================================
// ImportPipeline - 参数化导入流程
// ==========================================
pub struct ImportPipeline {
    store: Arc<dyn RecordStore>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn NotificationSink>,
    settings: ImportSettings,
    reconciliation: Arc<ReconciliationEngine>,
    history: Arc<HistoryLog>,
    parser: UniversalFileParser,
    session: ImportSession,
    pending: Option<PreparedBatch>,
    conflict_flow: Option<PeriodDeleteFlow>,
}

impl ImportPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn NotificationSink>,
        settings: ImportSettings,
        reconciliation: Arc<ReconciliationEngine>,
        history: Arc<HistoryLog>,
    ) -> Self {
        let session = ImportSession::new(RecordKind::EmployeeRoster, settings.message_log_capacity);
        Self {
            store,
            sessions,
            notifier,
            settings,
            reconciliation,
            history,
            parser: UniversalFileParser,
            session,
            pending: None,
            conflict_flow: None,
        }
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    pub fn pending_batch(&self) -> Option<&PreparedBatch> {
        self.pending.as_ref()
    }

    pub fn history(&self) -> &Arc<HistoryLog> {
        &self.history
    }

    fn push_message(&mut self, message: StatusMessage) {
        self.notifier.push(&message);
        self.session.messages.push(message);
    }

    /// 终止本次尝试：状态置 error 并输出用户消息
    fn fail(&mut self, err: &ImportError) {
        error!(session_id = %self.session.session_id, error = %err, "导入失败");
        self.session.status = ImportStatus::Error;
        self.push_message(StatusMessage::error(user_message(err)));
    }

    fn clear_conflict(&mut self) {
        self.session.conflict = None;
        self.conflict_flow = None;
    }

    // ==========================================
    // 选择文件 → 解析 → 校验
    // ==========================================

    /// 选择文件（总是先完全重置会话）
    ///
    /// # 返回
    /// - Ok(()): 批次已就绪，可调用 upload
    /// - Err: 解析 / 表头 / 阻断型行错误，会话状态为 error
    #[instrument(skip(self, bytes), fields(kind = %kind, size = bytes.len()))]
    pub async fn select_file(
        &mut self,
        kind: RecordKind,
        file_name: &str,
        bytes: &[u8],
    ) -> ImportResult<()> {
        self.session = ImportSession::new(kind, self.settings.message_log_capacity);
        self.pending = None;
        self.conflict_flow = None;
        self.reconciliation.invalidate_cache().await;

        self.session.file_name = Some(file_name.to_string());
        self.session.file_size = bytes.len();
        self.session.status = ImportStatus::Validating;

        match self.validate(kind, file_name, bytes) {
            Ok(batch) => {
                let rows = batch.len();
                self.pending = Some(batch);
                self.session.status = ImportStatus::Idle;
                self.session.set_progress(PROGRESS_VALIDATED);
                self.push_message(StatusMessage::info(t_with_args(
                    "import.ready",
                    &[("rows", &rows.to_string())],
                )));
                info!(session_id = %self.session.session_id, rows, "批次已就绪");
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn validate(
        &mut self,
        kind: RecordKind,
        file_name: &str,
        bytes: &[u8],
    ) -> ImportResult<PreparedBatch> {
        let workbook = self.parser.parse_bytes(file_name, bytes)?;
        self.session.set_progress(PROGRESS_PARSED);
        self.push_message(StatusMessage::info(t_with_args(
            "import.file_loaded",
            &[("file", file_name), ("rows", &workbook.rows.len().to_string())],
        )));

        let strategy = strategy_for(
            kind,
            self.settings.registration_threshold,
            &self.settings.overtime_reference_cell,
        );
        let validated = match strategy.prepare(&workbook) {
            Ok(v) => v,
            Err(ImportError::MissingHeaders(missing)) => {
                self.session.missing_fields = missing.clone();
                return Err(ImportError::MissingHeaders(missing));
            }
            Err(e) => return Err(e),
        };

        self.session.columns = validated.columns;
        self.session.rows = validated.rows;
        self.session.row_errors = validated.row_errors;

        let error_count = self.session.row_errors.len();
        if error_count > 0 {
            if kind.row_errors_block() {
                return Err(ImportError::RowValidation { count: error_count });
            }
            self.push_message(StatusMessage::warning(t_with_args(
                "import.row_errors_advisory",
                &[("count", &error_count.to_string())],
            )));
        }

        debug!(rows = self.session.rows.len(), errors = error_count, "校验完成");
        match validated.batch {
            Some(batch) if !batch.is_empty() => Ok(batch),
            _ => Err(ImportError::NoActionableRows),
        }
    }

    // ==========================================
    // 上传: 对账 → (冲突暂停 | 提交)
    // ==========================================

    #[instrument(skip(self), fields(session_id = %self.session.session_id, kind = %self.session.kind))]
    pub async fn upload(&mut self) -> ImportResult<UploadOutcome> {
        if self.session.is_paused_on_conflict() {
            return Err(ImportError::InvalidState(
                "conflito de período pendente".to_string(),
            ));
        }
        let Some(batch) = self.pending.clone() else {
            let err = ImportError::NoPendingBatch;
            self.fail(&err);
            return Err(err);
        };

        let progress_before = self.session.progress;
        self.session.status = ImportStatus::Uploading;

        match self.reconcile(batch, progress_before).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn reconcile(
        &mut self,
        batch: PreparedBatch,
        progress_before: u8,
    ) -> ImportResult<UploadOutcome> {
        let existing = self.reconciliation.existing_registrations().await?;

        let batch = match batch {
            PreparedBatch::Employees(rows) => {
                let partition =
                    partition_by_registration(rows, |r| Some(r.registration), &existing);
                if partition.inserts.is_empty() && partition.updates.is_empty() {
                    return Err(ImportError::NoActionableRows);
                }
                if !partition.duplicates.is_empty() {
                    let list = partition
                        .duplicates
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    warn!(count = partition.duplicates.len(), "文件内登记号重复，保留最后一行");
                    self.push_message(StatusMessage::warning(t_with_args(
                        "import.duplicate_registrations",
                        &[("list", &list)],
                    )));
                }
                self.session.set_progress(PROGRESS_RECONCILED);
                let summary = self.commit_employees(partition).await?;
                return Ok(UploadOutcome::Committed(summary));
            }
            other => other,
        };

        // 薪资 / 加班: 登记号必须全部已存在
        let unknown = cross_reference(batch.registrations(), &existing);
        if !unknown.is_empty() {
            return Err(ImportError::UnknownRegistrations(unknown));
        }

        if let Some(target) = batch.target_period() {
            if self
                .reconciliation
                .check_period_conflict(batch.kind(), &target)
                .await?
            {
                return Ok(UploadOutcome::ConflictPending(
                    self.pause_on_conflict(batch.kind(), target, progress_before),
                ));
            }
        }

        self.session.set_progress(PROGRESS_RECONCILED);
        let summary = self.commit_batch(batch, 0, None).await?;
        Ok(UploadOutcome::Committed(summary))
    }

    fn pause_on_conflict(
        &mut self,
        kind: RecordKind,
        target: TargetPeriod,
        progress_before: u8,
    ) -> PeriodConflict {
        let conflict = PeriodConflict::new(target.clone());
        let file_name = self.session.file_name.clone().unwrap_or_default();
        self.conflict_flow = Some(PeriodDeleteFlow::new(
            kind,
            target,
            &file_name,
            HistoryKind::System,
            self.settings.max_password_attempts,
            Arc::clone(&self.reconciliation),
            Arc::clone(&self.history),
        ));

        // 冲突期间对用户而言仍是 idle，进度不前进
        self.session.status = ImportStatus::Idle;
        self.session.set_progress(progress_before);
        self.session.conflict = Some(conflict.clone());
        self.push_message(StatusMessage::warning(t_with_args(
            "import.period_conflict",
            &[("period", &conflict.period_ref)],
        )));
        warn!(period = %conflict.period_key, "目标期间已有数据，等待密码确认");
        conflict
    }

    // ==========================================
    // 冲突确认 / 取消
    // ==========================================

    /// 提交冲突确认密码
    #[instrument(skip(self, password), fields(session_id = %self.session.session_id))]
    pub async fn confirm_conflict(&mut self, password: &str) -> ImportResult<ConflictOutcome> {
        let Some(flow) = self.conflict_flow.as_mut() else {
            return Err(ImportError::NoPendingConflict);
        };
        let Some(user) = self.sessions.current_user().await else {
            return Err(ImportError::NoSessionUser);
        };

        let outcome = match flow.confirm(password, &user).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.clear_conflict();
                self.fail(&err);
                return Err(err);
            }
        };
        let attempts = flow.attempts();

        match outcome {
            DeleteOutcome::Rejected { kind, remaining } => {
                if let Some(conflict) = self.session.conflict.as_mut() {
                    conflict.error = Some(kind);
                    conflict.attempts = attempts;
                }
                let text = match kind {
                    PasswordErrorKind::Required => t("password.required"),
                    PasswordErrorKind::Invalid => t_with_args(
                        "password.invalid",
                        &[("remaining", &remaining.to_string())],
                    ),
                };
                self.push_message(StatusMessage::error(text));
                Ok(ConflictOutcome::Retry { kind, remaining })
            }
            DeleteOutcome::Aborted => {
                self.clear_conflict();
                self.pending = None;
                self.fail(&ImportError::PasswordAttemptsExhausted);
                Ok(ConflictOutcome::Aborted)
            }
            DeleteOutcome::Deleted {
                count,
                history_error,
            } => {
                self.clear_conflict();
                self.push_message(StatusMessage::info(t_with_args(
                    "import.deleted",
                    &[("count", &count.to_string())],
                )));

                let Some(batch) = self.pending.clone() else {
                    let err = ImportError::NoPendingBatch;
                    self.fail(&err);
                    return Err(err);
                };
                self.session.status = ImportStatus::Uploading;
                self.session.set_progress(PROGRESS_RECONCILED);
                match self.commit_batch(batch, count, history_error).await {
                    Ok(summary) => Ok(ConflictOutcome::Committed(summary)),
                    Err(err) => {
                        self.fail(&err);
                        Err(err)
                    }
                }
            }
        }
    }

    /// 取消冲突：丢弃本地状态（不影响已发出的请求）
    pub async fn cancel_conflict(&mut self) {
        if self.session.is_paused_on_conflict() {
            self.reset().await;
            self.push_message(StatusMessage::info(t("import.cancelled")));
        }
    }

    /// 完全重置会话（保留记录类型）
    pub async fn reset(&mut self) {
        self.session = ImportSession::new(self.session.kind, self.settings.message_log_capacity);
        self.pending = None;
        self.conflict_flow = None;
        self.reconciliation.invalidate_cache().await;
    }

    /// 独立的期间删除流程（manual 历史）
    pub fn begin_period_delete(&self, kind: RecordKind, target: TargetPeriod) -> PeriodDeleteFlow {
        PeriodDeleteFlow::new(
            kind,
            target,
            "",
            HistoryKind::Manual,
            self.settings.max_password_attempts,
            Arc::clone(&self.reconciliation),
            Arc::clone(&self.history),
        )
    }

    // ==========================================
    // 提交
    // ==========================================

    async fn acting_user(&self) -> String {
        self.sessions
            .current_user()
            .await
            .map(|u| u.display_name)
            .unwrap_or_else(|| "system".to_string())
    }

    async fn commit_employees(
        &mut self,
        partition: Partition<EmployeeRecord>,
    ) -> ImportResult<CommitSummary> {
        let user = self.acting_user().await;
        let now = Utc::now();
        let collection = RecordKind::EmployeeRoster.collection();

        let inserts = partition.inserts.len();
        let updates = partition.updates.len();

        if inserts > 0 {
            let rows = partition
                .inserts
                .into_iter()
                .map(|r| to_row(&r.stamp_registered(&user, now)))
                .collect::<RepositoryResult<Vec<_>>>()?;
            self.store.insert(collection, rows).await?;
        }
        for record in partition.updates {
            let filter = Filter::eq("registration", record.registration);
            // 空值不进补丁：缺列或空单元格不覆盖已有值
            let mut patch = to_row(&record.stamp_updated(&user, now))?;
            patch.retain(|_, v| !v.is_null());
            self.store.update(collection, &filter, patch).await?;
        }
        self.session.set_progress(PROGRESS_WRITTEN);
        info!(inserts, updates, "花名册已写入");

        let summary = CommitSummary {
            kind: RecordKind::EmployeeRoster,
            inserts,
            updates,
            deleted: 0,
            history_warning: None,
        };
        Ok(self
            .finish_commit(summary, collection.to_string(), &user)
            .await)
    }

    async fn commit_batch(
        &mut self,
        batch: PreparedBatch,
        deleted: usize,
        history_warning: Option<String>,
    ) -> ImportResult<CommitSummary> {
        let kind = batch.kind();
        let label = match batch.target_period() {
            Some(target) => period_label(kind, &target),
            None => kind.collection().to_string(),
        };

        let rows = match &batch {
            PreparedBatch::Employees(_) => {
                return Err(ImportError::InvalidState(
                    "cadastro de funcionários não usa período".to_string(),
                ))
            }
            PreparedBatch::Payroll { rows, .. } => {
                rows.iter().map(to_row).collect::<RepositoryResult<Vec<_>>>()?
            }
            PreparedBatch::Overtime { rows, .. } => {
                rows.iter().map(to_row).collect::<RepositoryResult<Vec<_>>>()?
            }
        };
        let inserts = self.store.insert(kind.collection(), rows).await?;
        self.session.set_progress(PROGRESS_WRITTEN);
        info!(inserts, deleted, "批次已写入");

        if let Some(warning) = &history_warning {
            self.push_message(StatusMessage::warning(t_with_args(
                "import.history_failed",
                &[("error", warning)],
            )));
        }

        let user = self.acting_user().await;
        let summary = CommitSummary {
            kind,
            inserts,
            updates: 0,
            deleted,
            history_warning,
        };
        Ok(self.finish_commit(summary, label, &user).await)
    }

    /// 追加 Importado 历史并收尾（历史失败只告警，不回滚）
    async fn finish_commit(
        &mut self,
        mut summary: CommitSummary,
        label: String,
        user: &str,
    ) -> CommitSummary {
        let action = if summary.inserts > 0 {
            HistoryAction::Inclusao
        } else {
            HistoryAction::Update
        };
        let entry = HistoryEntry::new(
            label,
            action,
            self.session.file_name.clone().unwrap_or_default(),
            user,
            HistoryKind::Importado,
        );
        if let Err(e) = self.history.append(entry).await {
            warn!(error = %e, "数据已写入，但历史记录追加失败");
            self.push_message(StatusMessage::warning(t_with_args(
                "import.history_failed",
                &[("error", &e.to_string())],
            )));
            summary.history_warning = Some(e.to_string());
        }

        self.pending = None;
        self.reconciliation.invalidate_cache().await;
        self.session.status = ImportStatus::Done;
        self.session.set_progress(100);
        self.push_message(StatusMessage::success(t_with_args(
            "import.committed",
            &[
                ("inserts", &summary.inserts.to_string()),
                ("updates", &summary.updates.to_string()),
            ],
        )));
        info!(
            session_id = %self.session.session_id,
            inserts = summary.inserts,
            updates = summary.updates,
            deleted = summary.deleted,
            "导入完成"
        );
        summary
    }
}

/// 错误 → 用户消息
fn user_message(err: &ImportError) -> String {
    match err {
        ImportError::MissingHeaders(fields) => {
            t_with_args("import.missing_headers", &[("fields", &fields.join(", "))])
        }
        ImportError::RowValidation { count } => {
            t_with_args("import.row_errors_blocking", &[("count", &count.to_string())])
        }
        ImportError::MultipleCompetences(list) => {
            t_with_args("validation.multiple_competences", &[("list", &list.join(", "))])
        }
        ImportError::UnknownRegistrations(list) => {
            let list = list
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            t_with_args("import.unknown_registrations", &[("list", &list)])
        }
        ImportError::NoActionableRows => t("import.no_actionable_rows"),
        ImportError::NoPendingBatch => t("import.no_file"),
        ImportError::PasswordAttemptsExhausted => t("password.exhausted"),
        // 远程消息原样透出
        ImportError::Repository(e) => t_with_args("import.commit_failed", &[("error", &e.to_string())]),
        other => other.to_string(),
    }
}
