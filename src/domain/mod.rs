// ==========================================
// 人事薪资后台 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod employee;
pub mod history;
pub mod overtime;
pub mod payroll;
pub mod session;
pub mod types;

// 重导出核心类型
pub use employee::EmployeeRecord;
pub use history::HistoryEntry;
pub use overtime::{OvertimeBuckets, OvertimeRecord};
pub use payroll::{month_start, next_month_start, PayrollRecord};
pub use session::{
    FieldError, ImportSession, MessageLog, ParsedRow, PeriodConflict, RowError, StatusMessage,
    TargetPeriod,
};
pub use types::{
    HistoryAction, HistoryKind, ImportStatus, OvertimeCode, PasswordErrorKind, RecordKind,
    Severity,
};
