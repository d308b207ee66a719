// ==========================================
// 人事薪资后台 - 应用层
// ==========================================
// 职责: 会话 / 通知 / 应用状态组装
// ==========================================

pub mod notification;
pub mod session;
pub mod state;

// 重导出
pub use notification::{CollectingNotificationSink, NotificationSink, TracingNotificationSink};
pub use session::{hash_password, SessionStore, SessionUser, StaticSessionStore, DELETE_PERMISSION};
pub use state::{get_default_db_path, AppState};
