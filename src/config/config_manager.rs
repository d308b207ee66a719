// ==========================================
// 人事薪资后台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, ImportSettings};
use crate::db::{open_in_memory_connection, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置键
pub mod config_keys {
    pub const REGISTRATION_THRESHOLD: &str = "import.registration_threshold";
    pub const REGISTRATION_PAGE_SIZE: &str = "import.registration_page_size";
    pub const MAX_PASSWORD_ATTEMPTS: &str = "import.max_password_attempts";
    pub const MESSAGE_LOG_CAPACITY: &str = "import.message_log_capacity";
    pub const HISTORY_FIELD_MAX_LEN: &str = "history.field_max_len";
    pub const HISTORY_REFRESH_INTERVAL_SECS: &str = "history.refresh_interval_secs";
    pub const HISTORY_PAGE_SIZE: &str = "history.page_size";
    pub const OVERTIME_REFERENCE_CELL: &str = "overtime.reference_cell";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
    defaults: ImportSettings,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = open_in_memory_connection()?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            defaults: ImportSettings::default(),
        }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 读取并解析配置值，缺失或格式错误时回退默认值
    fn get_parsed_or<T: FromStr + Copy + std::fmt::Display>(
        &self,
        key: &str,
        default: T,
    ) -> RepositoryResult<T> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, default = %default, "配置值格式错误，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_registration_threshold(&self) -> RepositoryResult<i64> {
        self.get_parsed_or(
            config_keys::REGISTRATION_THRESHOLD,
            self.defaults.registration_threshold,
        )
    }

    async fn get_registration_page_size(&self) -> RepositoryResult<usize> {
        let size = self.get_parsed_or(
            config_keys::REGISTRATION_PAGE_SIZE,
            self.defaults.registration_page_size,
        )?;
        Ok(size.max(1))
    }

    async fn get_max_password_attempts(&self) -> RepositoryResult<u8> {
        let attempts = self.get_parsed_or(
            config_keys::MAX_PASSWORD_ATTEMPTS,
            self.defaults.max_password_attempts,
        )?;
        Ok(attempts.max(1))
    }

    async fn get_message_log_capacity(&self) -> RepositoryResult<usize> {
        let capacity = self.get_parsed_or(
            config_keys::MESSAGE_LOG_CAPACITY,
            self.defaults.message_log_capacity,
        )?;
        Ok(capacity.max(1))
    }

    async fn get_history_field_max_len(&self) -> RepositoryResult<usize> {
        self.get_parsed_or(
            config_keys::HISTORY_FIELD_MAX_LEN,
            self.defaults.history_field_max_len,
        )
    }

    async fn get_history_refresh_interval_secs(&self) -> RepositoryResult<u64> {
        let secs = self.get_parsed_or(
            config_keys::HISTORY_REFRESH_INTERVAL_SECS,
            self.defaults.history_refresh_interval_secs,
        )?;
        Ok(secs.max(1))
    }

    async fn get_history_page_size(&self) -> RepositoryResult<usize> {
        let size = self.get_parsed_or(config_keys::HISTORY_PAGE_SIZE, self.defaults.history_page_size)?;
        Ok(size.max(1))
    }

    async fn get_overtime_reference_cell(&self) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(config_keys::OVERTIME_REFERENCE_CELL)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.defaults.overtime_reference_cell.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let manager = ConfigManager::open_in_memory().unwrap();
        let settings = manager.load_settings().await.unwrap();
        assert_eq!(settings, ImportSettings::default());
    }

    #[tokio::test]
    async fn test_overrides_and_bad_values() {
        let manager = ConfigManager::open_in_memory().unwrap();
        manager
            .set_global_config_value(config_keys::REGISTRATION_THRESHOLD, "50000")
            .unwrap();
        manager
            .set_global_config_value(config_keys::MAX_PASSWORD_ATTEMPTS, "cinco")
            .unwrap();
        manager
            .set_global_config_value(config_keys::OVERTIME_REFERENCE_CELL, "C3")
            .unwrap();

        let settings = manager.load_settings().await.unwrap();
        assert_eq!(settings.registration_threshold, 50_000);
        assert_eq!(settings.max_password_attempts, 3);
        assert_eq!(settings.overtime_reference_cell, "C3");

        let snapshot = manager.get_config_snapshot().unwrap();
        assert_eq!(snapshot.len(), 3);
    }
}
