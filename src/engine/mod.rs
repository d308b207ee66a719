// ==========================================
// 人事薪资后台 - 引擎层
// ==========================================
// 职责: 对账 / 密码确认 / 期间删除 / 历史日志 / 记录类型策略 / 导入状态机
// 红线: 不直接解析文件，不直接拼接存储查询
// ==========================================

pub mod history_log;
pub mod import_pipeline;
pub mod password_gate;
pub mod period_delete;
pub mod reconciliation;
pub mod strategy;

pub use history_log::{HistoryLog, HistoryPage, HISTORY_COLLECTION};
pub use import_pipeline::{CommitSummary, ConflictOutcome, ImportPipeline, UploadOutcome};
pub use password_gate::{PasswordGate, PasswordOutcome};
pub use period_delete::{period_label, DeleteOutcome, PeriodDeleteFlow};
pub use reconciliation::{
    cross_reference, partition_by_registration, period_filter, Partition, ReconciliationEngine,
    EMPLOYEE_COLLECTION,
};
pub use strategy::{
    strategy_for, EmployeeStrategy, OvertimeStrategy, PayrollStrategy, PreparedBatch,
    RecordTypeStrategy, Validated,
};
