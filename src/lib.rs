// ==========================================
// 人事薪资后台 - 核心库
// ==========================================
// 职责: 表格导入与对账管道（花名册 / 薪资结算 / 加班报表）
// 技术栈: Rust + SQLite / 远程数据 API
// 系统定位: 人工监督的低频导入（冲突需密码确认）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "pt-BR");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 命名集合存储
pub mod repository;

// 引擎层 - 对账与导入状态机
pub mod engine;

// 导入层 - 文件解析与校验
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 应用层 - 会话 / 通知 / 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    HistoryAction, HistoryKind, ImportStatus, OvertimeCode, PasswordErrorKind, RecordKind,
    Severity,
};

// 领域实体
pub use domain::{
    EmployeeRecord, HistoryEntry, ImportSession, OvertimeRecord, PayrollRecord, PeriodConflict,
    StatusMessage, TargetPeriod,
};

// 引擎
pub use engine::{
    ConflictOutcome, HistoryLog, ImportPipeline, PeriodDeleteFlow, ReconciliationEngine,
    UploadOutcome,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "人事薪资后台";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
