// ==========================================
// 人事薪资后台 - 导入历史日志
// ==========================================
// 职责: 仅追加写入（数字 ID + 字段截断）后全量重读；分页 / 搜索；后台定时刷新
// 红线: 从不更新或删除历史记录；后台刷新只读
// ==========================================

use crate::domain::history::HistoryEntry;
use crate::importer::cell_normalizer::normalize_header;
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::{from_row, to_row, RecordStore, SelectQuery};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 历史集合名
pub const HISTORY_COLLECTION: &str = "history";

/// 一页历史记录
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub items: Vec<HistoryEntry>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

pub struct HistoryLog {
    store: Arc<dyn RecordStore>,
    field_max_len: usize,
    last_id: AtomicI64,
    entries: RwLock<Vec<HistoryEntry>>,
    // 追加与刷新串行化，避免旧快照覆盖新快照
    sync: Mutex<()>,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn RecordStore>, field_max_len: usize) -> Self {
        Self {
            store,
            field_max_len,
            last_id: AtomicI64::new(0),
            entries: RwLock::new(Vec::new()),
            sync: Mutex::new(()),
        }
    }

    /// 单调递增的数字 ID（毫秒时间戳，冲突时 +1）
    fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut current = self.last_id.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(current + 1);
            match self.last_id.compare_exchange(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }

    /// 追加一条历史并重读（重读失败不影响结果）
    ///
    /// # 返回
    /// - Ok(HistoryEntry): 实际写入的记录（已分配 ID、已截断）
    pub async fn append(&self, entry: HistoryEntry) -> RepositoryResult<HistoryEntry> {
        let _guard = self.sync.lock().await;

        let mut entry = entry.truncated(self.field_max_len);
        entry.id = self.next_id();
        self.store
            .insert(HISTORY_COLLECTION, vec![to_row(&entry)?])
            .await?;
        info!(
            id = entry.id,
            table = %entry.table_label,
            action = %entry.action,
            file = %entry.file_name,
            "历史记录已追加"
        );

        // 已写入即成功；重读失败时把新记录补进本地快照
        if let Err(e) = self.reload().await {
            warn!(error = %e, id = entry.id, "历史记录已写入，但重读失败");
            self.entries.write().await.insert(0, entry.clone());
        }
        Ok(entry)
    }

    /// 重读全部历史（按 ID 降序）
    pub async fn refresh(&self) -> RepositoryResult<usize> {
        let _guard = self.sync.lock().await;
        self.reload().await
    }

    async fn reload(&self) -> RepositoryResult<usize> {
        let rows = self
            .store
            .select(HISTORY_COLLECTION, &SelectQuery::all().order_by("id", true))
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match from_row::<HistoryEntry>(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "跳过无法解析的历史记录"),
            }
        }

        if let Some(max_id) = entries.iter().map(|e| e.id).max() {
            self.last_id.fetch_max(max_id, Ordering::SeqCst);
        }

        let count = entries.len();
        *self.entries.write().await = entries;
        debug!(count, "历史记录已重读");
        Ok(count)
    }

    /// 当前快照（最新在前）
    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.clone()
    }

    /// 分页 + 搜索（去重音、忽略大小写的子串匹配；页码从 1 开始）
    pub async fn page(&self, search: Option<&str>, page: usize, page_size: usize) -> HistoryPage {
        let page_size = page_size.max(1);
        let needle = search.map(normalize_header).filter(|s| !s.is_empty());

        let entries = self.entries.read().await;
        let matched: Vec<&HistoryEntry> = entries
            .iter()
            .filter(|e| match &needle {
                Some(n) => [
                    e.table_label.as_str(),
                    e.action.as_str(),
                    e.file_name.as_str(),
                    e.user.as_str(),
                ]
                .iter()
                .any(|field| normalize_header(field).contains(n.as_str())),
                None => true,
            })
            .collect();

        let total = matched.len();
        let total_pages = total.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);
        let items = matched
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();

        HistoryPage {
            items,
            total,
            page,
            total_pages,
        }
    }

    /// 后台定时刷新（只读）
    pub fn spawn_refresh(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "历史记录后台刷新失败");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{HistoryAction, HistoryKind};
    use crate::repository::error::RepositoryError;
    use crate::repository::record_store::{Filter, Row};
    use crate::repository::sqlite_store::SqliteRecordStore;

    fn log() -> HistoryLog {
        HistoryLog::new(Arc::new(SqliteRecordStore::open_in_memory().unwrap()), 50)
    }

    fn entry(label: &str, action: HistoryAction, file: &str) -> HistoryEntry {
        HistoryEntry::new(label, action, file, "Ana", HistoryKind::Importado)
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids_newest_first() {
        let history = log();
        let first = history
            .append(entry("payroll Ref. 03/2025", HistoryAction::Delete, "folha.xlsx"))
            .await
            .unwrap();
        let second = history
            .append(entry("payroll Ref. 03/2025", HistoryAction::Inclusao, "folha.xlsx"))
            .await
            .unwrap();
        assert!(second.id > first.id);

        let entries = history.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, HistoryAction::Inclusao);
        assert_eq!(entries[1].action, HistoryAction::Delete);
    }

    #[tokio::test]
    async fn test_append_truncates_file_name() {
        let history = log();
        let stored = history
            .append(entry("employees", HistoryAction::Update, &"f".repeat(70)))
            .await
            .unwrap();
        assert_eq!(stored.file_name.len(), 50);
        assert_eq!(history.entries().await[0].file_name.len(), 50);
    }

    #[tokio::test]
    async fn test_page_and_search() {
        let history = log();
        for i in 0..12 {
            history
                .append(entry("overtime Ref. 10/03/2025", HistoryAction::Inclusao, &format!("horas_{}.csv", i)))
                .await
                .unwrap();
        }
        history
            .append(entry("payroll Ref. 03/2025", HistoryAction::Alterou, "Folha Março.xlsx"))
            .await
            .unwrap();

        let first = history.page(None, 1, 10).await;
        assert_eq!(first.total, 13);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.items.len(), 10);

        let second = history.page(None, 2, 10).await;
        assert_eq!(second.items.len(), 3);

        let found = history.page(Some("marco"), 1, 10).await;
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].file_name, "Folha Março.xlsx");

        // 超出范围的页码被夹紧
        assert_eq!(history.page(None, 9, 10).await.page, 2);
    }

    /// 历史集合读取失败的存储包装
    struct UnreadableHistoryStore(SqliteRecordStore);

    #[async_trait::async_trait]
    impl RecordStore for UnreadableHistoryStore {
        async fn select(&self, collection: &str, query: &SelectQuery) -> RepositoryResult<Vec<Row>> {
            if collection == HISTORY_COLLECTION {
                return Err(RepositoryError::HttpError("timeout".to_string()));
            }
            self.0.select(collection, query).await
        }

        async fn insert(&self, collection: &str, rows: Vec<Row>) -> RepositoryResult<usize> {
            self.0.insert(collection, rows).await
        }

        async fn update(
            &self,
            collection: &str,
            filter: &Filter,
            patch: Row,
        ) -> RepositoryResult<usize> {
            self.0.update(collection, filter, patch).await
        }

        async fn delete(&self, collection: &str, filter: &Filter) -> RepositoryResult<usize> {
            self.0.delete(collection, filter).await
        }
    }

    #[tokio::test]
    async fn test_append_succeeds_when_reload_fails() {
        let inner = SqliteRecordStore::open_in_memory().unwrap();
        let history = HistoryLog::new(Arc::new(UnreadableHistoryStore(inner)), 50);

        let stored = history
            .append(entry("employees", HistoryAction::Inclusao, "funcionarios.csv"))
            .await
            .unwrap();

        let entries = history.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, stored.id);
        assert!(history.refresh().await.is_err());
    }
}
