// ==========================================
// 人事薪资后台 - 应用状态
// ==========================================
// 职责: 组装共享资源（存储 / 配置 / 会话 / 通知 / 对账 / 历史）
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::app::notification::{NotificationSink, TracingNotificationSink};
use crate::app::session::SessionStore;
use crate::config::{ConfigManager, ImportConfigReader, ImportSettings};
use crate::db::open_sqlite_connection;
use crate::engine::{HistoryLog, ImportPipeline, ReconciliationEngine};
use crate::repository::{RecordStore, RestRecordStore, SqliteRecordStore};

/// 远程数据 API 地址（设置后记录走 HTTP，配置仍在本地 SQLite）
pub const REST_URL_ENV: &str = "HR_IMPORT_REST_URL";
pub const REST_KEY_ENV: &str = "HR_IMPORT_REST_KEY";
pub const DB_PATH_ENV: &str = "HR_IMPORT_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器（config_kv）
    pub config: Arc<ConfigManager>,

    /// 启动时读取的配置快照
    pub settings: ImportSettings,

    /// 记录存储
    pub store: Arc<dyn RecordStore>,

    /// 会话（当前用户）
    pub sessions: Arc<dyn SessionStore>,

    /// 通知输出
    pub notifier: Arc<dyn NotificationSink>,

    /// 对账引擎（登记号缓存跨会话共享）
    pub reconciliation: Arc<ReconciliationEngine>,

    /// 导入历史
    pub history: Arc<HistoryLog>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - sessions: 会话存储
    ///
    /// # 返回
    /// - Err(String): 初始化错误
    pub async fn new(db_path: String, sessions: Arc<dyn SessionStore>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = Arc::new(ConfigManager::from_connection(Arc::clone(&conn)));
        let settings = config
            .load_settings()
            .await
            .map_err(|e| format!("无法读取配置: {}", e))?;

        let store: Arc<dyn RecordStore> = match std::env::var(REST_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::info!(url = %url, "记录存储: 远程数据 API");
                Arc::new(RestRecordStore::new(
                    url.trim(),
                    std::env::var(REST_KEY_ENV).ok(),
                ))
            }
            _ => Arc::new(SqliteRecordStore::from_connection(conn)),
        };

        Ok(Self::with_store(db_path, config, settings, store, sessions))
    }

    /// 用现成的存储组装（测试 / 嵌入）
    pub fn with_store(
        db_path: String,
        config: Arc<ConfigManager>,
        settings: ImportSettings,
        store: Arc<dyn RecordStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let reconciliation = Arc::new(ReconciliationEngine::new(
            Arc::clone(&store),
            settings.registration_page_size,
        ));
        let history = Arc::new(HistoryLog::new(
            Arc::clone(&store),
            settings.history_field_max_len,
        ));

        tracing::info!("AppState初始化完成");
        Self {
            db_path,
            config,
            settings,
            store,
            sessions,
            notifier: Arc::new(TracingNotificationSink),
            reconciliation,
            history,
        }
    }

    /// 新的导入状态机（共享对账缓存与历史）
    pub fn import_pipeline(&self) -> ImportPipeline {
        ImportPipeline::new(
            Arc::clone(&self.store),
            Arc::clone(&self.sessions),
            Arc::clone(&self.notifier),
            self.settings.clone(),
            Arc::clone(&self.reconciliation),
            Arc::clone(&self.history),
        )
    }

    /// 启动历史后台刷新
    pub fn spawn_history_refresh(&self) -> JoinHandle<()> {
        Arc::clone(&self.history).spawn_refresh(Duration::from_secs(
            self.settings.history_refresh_interval_secs.max(1),
        ))
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 HR_IMPORT_DB_PATH（非空时）
/// - 否则: 用户数据目录/hr-import/hr_import.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./hr_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("hr-import");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("hr_import.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::{SessionUser, StaticSessionStore};
    use crate::config::config_keys;
    use tempfile::TempDir;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[tokio::test]
    async fn test_app_state_reads_persisted_settings() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let manager = ConfigManager::new(&db_path).unwrap();
        manager
            .set_global_config_value(config_keys::MAX_PASSWORD_ATTEMPTS, "5")
            .unwrap();
        drop(manager);

        let sessions = Arc::new(StaticSessionStore::new(SessionUser::new(
            "u1", "Operador", "segredo", "",
        )));
        let state = AppState::new(db_path.clone(), sessions).await.unwrap();
        assert_eq!(state.settings.max_password_attempts, 5);
        assert_eq!(state.settings.registration_page_size, 1000);
        assert_eq!(state.get_db_path(), db_path);

        let pipeline = state.import_pipeline();
        assert!(pipeline.pending_batch().is_none());
    }
}
