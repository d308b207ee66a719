// ==========================================
// 人事薪资后台 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供命名集合上的数据访问接口，屏蔽本地库 / 远程 API 细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod record_store;
pub mod rest_store;
pub mod sqlite_store;

// 重导出核心类型
pub use error::{RepositoryError, RepositoryResult};
pub use record_store::{from_row, to_row, Filter, RecordStore, Row, SelectQuery};
pub use rest_store::RestRecordStore;
pub use sqlite_store::SqliteRecordStore;
