// ==========================================
// 人事薪资后台 - 导入会话模型
// ==========================================
// 职责: 一次导入尝试的瞬态状态（选文件时创建，重置时丢弃）
// ==========================================

use crate::domain::types::{ImportStatus, PasswordErrorKind, RecordKind, Severity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

/// 默认消息日志容量
pub const DEFAULT_MESSAGE_LOG_CAPACITY: usize = 6;

// ==========================================
// StatusMessage - 带级别的状态消息
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

impl StatusMessage {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Severity::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Severity::Info, text)
    }
}

// ==========================================
// MessageLog - 滚动消息日志（最新在前，定长）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    capacity: usize,
    entries: VecDeque<StatusMessage>,
}

impl MessageLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, message: StatusMessage) {
        self.entries.push_front(message);
        self.entries.truncate(self.capacity);
    }

    /// 最新在前
    pub fn iter(&self) -> impl Iterator<Item = &StatusMessage> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&StatusMessage> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MESSAGE_LOG_CAPACITY)
    }
}

// ==========================================
// RowError - 行级校验错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row_index: usize, // 展示行号 = 数组下标 + 2（含表头行）
    pub errors: Vec<FieldError>,
}

// ==========================================
// TargetPeriod - 批次目标期间
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetPeriod {
    Month(NaiveDate),            // 薪资：月初
    Dates(BTreeSet<NaiveDate>),  // 加班：日期集合
}

impl TargetPeriod {
    /// 人类可读期间（"03/2025" 或 "10/03/2025, 11/03/2025"）
    pub fn reference_label(&self) -> String {
        match self {
            TargetPeriod::Month(month) => month.format("%m/%Y").to_string(),
            TargetPeriod::Dates(dates) => dates
                .iter()
                .map(|d| d.format("%d/%m/%Y").to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// 规范期间键（ISO）
    pub fn key(&self) -> String {
        match self {
            TargetPeriod::Month(month) => month.format("%Y-%m-%d").to_string(),
            TargetPeriod::Dates(dates) => dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

// ==========================================
// PeriodConflict - 期间冲突（待人工确认）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodConflict {
    pub period_ref: String,
    pub period_key: String,
    pub target: TargetPeriod,
    #[serde(skip)]
    pub password_input: String,
    pub error: Option<PasswordErrorKind>,
    pub attempts: u8,
}

impl PeriodConflict {
    pub fn new(target: TargetPeriod) -> Self {
        Self {
            period_ref: target.reference_label(),
            period_key: target.key(),
            target,
            password_input: String::new(),
            error: None,
            attempts: 0,
        }
    }
}

/// 预览行（规范字段名 → 展示值）
pub type ParsedRow = BTreeMap<String, String>;

// ==========================================
// ImportSession - 导入会话
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    pub session_id: String,
    pub kind: RecordKind,
    pub file_name: Option<String>,
    pub file_size: usize,
    pub rows: Vec<ParsedRow>,
    pub columns: Vec<String>,
    pub missing_fields: Vec<String>,
    pub row_errors: Vec<RowError>,
    pub status: ImportStatus,
    pub progress: u8,
    pub messages: MessageLog,
    pub conflict: Option<PeriodConflict>,
}

impl ImportSession {
    pub fn new(kind: RecordKind, message_capacity: usize) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            kind,
            file_name: None,
            file_size: 0,
            rows: Vec::new(),
            columns: Vec::new(),
            missing_fields: Vec::new(),
            row_errors: Vec::new(),
            status: ImportStatus::Idle,
            progress: 0,
            messages: MessageLog::with_capacity(message_capacity),
            conflict: None,
        }
    }

    /// 是否处于冲突暂停分支
    pub fn is_paused_on_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }
}
