// ==========================================
// 人事薪资后台 - 配置层
// ==========================================
// 职责: 导入管道配置管理，缺省值 + 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ImportConfigReader, ImportSettings};
