// ==========================================
// 人事薪资后台 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// ImportSettings - 配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub registration_threshold: i64,
    pub registration_page_size: usize,
    pub max_password_attempts: u8,
    pub message_log_capacity: usize,
    pub history_field_max_len: usize,
    pub history_refresh_interval_secs: u64,
    pub history_page_size: usize,
    pub overtime_reference_cell: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            registration_threshold: 100_000,
            registration_page_size: 1000,
            max_password_attempts: 3,
            message_log_capacity: 6,
            history_field_max_len: 50,
            history_refresh_interval_secs: 30,
            history_page_size: 10,
            overtime_reference_cell: "B2".to_string(),
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 导入配置 =====

    /// 非结构化加班报表的登记号阈值
    ///
    /// # 默认值
    /// - 100000
    async fn get_registration_threshold(&self) -> RepositoryResult<i64>;

    /// 登记号集合分页大小
    ///
    /// # 默认值
    /// - 1000
    async fn get_registration_page_size(&self) -> RepositoryResult<usize>;

    /// 密码尝试上限
    ///
    /// # 默认值
    /// - 3
    async fn get_max_password_attempts(&self) -> RepositoryResult<u8>;

    /// 滚动消息日志容量
    async fn get_message_log_capacity(&self) -> RepositoryResult<usize>;

    // ===== 历史配置 =====

    /// 历史标签 / 文件名截断宽度
    ///
    /// # 默认值
    /// - 50
    async fn get_history_field_max_len(&self) -> RepositoryResult<usize>;

    async fn get_history_refresh_interval_secs(&self) -> RepositoryResult<u64>;

    async fn get_history_page_size(&self) -> RepositoryResult<usize>;

    // ===== 加班报表 =====

    /// 参考日期单元格（A1 记法）
    async fn get_overtime_reference_cell(&self) -> RepositoryResult<String>;

    /// 一次性读取全部导入配置
    async fn load_settings(&self) -> RepositoryResult<ImportSettings> {
        Ok(ImportSettings {
            registration_threshold: self.get_registration_threshold().await?,
            registration_page_size: self.get_registration_page_size().await?,
            max_password_attempts: self.get_max_password_attempts().await?,
            message_log_capacity: self.get_message_log_capacity().await?,
            history_field_max_len: self.get_history_field_max_len().await?,
            history_refresh_interval_secs: self.get_history_refresh_interval_secs().await?,
            history_page_size: self.get_history_page_size().await?,
            overtime_reference_cell: self.get_overtime_reference_cell().await?,
        })
    }
}
