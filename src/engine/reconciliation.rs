// ==========================================
// 人事薪资后台 - 对账引擎
// ==========================================
// 职责: 已有登记号集合（分页读取 + 会话内缓存）、新增/更新划分、
//       登记号交叉校验、期间冲突检测、期间删除
// 红线: Engine 不拼 SQL，只通过 RecordStore 访问数据
// ==========================================

use crate::domain::session::TargetPeriod;
use crate::domain::payroll::next_month_start;
use crate::domain::types::RecordKind;
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::{Filter, RecordStore, Row, SelectQuery};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// 员工集合名
pub const EMPLOYEE_COLLECTION: &str = "employees";

/// 划分结果
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<T> {
    pub inserts: Vec<T>,
    pub updates: Vec<T>,
    pub duplicates: Vec<i64>, // 文件内重复出现的登记号（升序）
}

/// 按登记号是否已存在划分新增 / 更新；无登记号的行两边都不进
///
/// 同一登记号在文件内出现多次时只保留最后一行（位置取首次出现处）
pub fn partition_by_registration<T>(
    rows: Vec<T>,
    registration: impl Fn(&T) -> Option<i64>,
    existing: &HashSet<i64>,
) -> Partition<T> {
    let mut slots: Vec<(i64, T)> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut duplicates = BTreeSet::new();

    for row in rows {
        let Some(r) = registration(&row) else {
            continue;
        };
        match positions.get(&r) {
            Some(&idx) => {
                duplicates.insert(r);
                slots[idx].1 = row;
            }
            None => {
                positions.insert(r, slots.len());
                slots.push((r, row));
            }
        }
    }

    let mut partition = Partition {
        inserts: Vec::new(),
        updates: Vec::new(),
        duplicates: duplicates.into_iter().collect(),
    };
    for (r, row) in slots {
        if existing.contains(&r) {
            partition.updates.push(row);
        } else {
            partition.inserts.push(row);
        }
    }
    partition
}

/// 未知登记号（升序、去重）
pub fn cross_reference(
    registrations: impl IntoIterator<Item = i64>,
    existing: &HashSet<i64>,
) -> Vec<i64> {
    registrations
        .into_iter()
        .filter(|r| !existing.contains(r))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 期间过滤条件（花名册无期间）
pub fn period_filter(kind: RecordKind, target: &TargetPeriod) -> Option<Filter> {
    let field = kind.period_field()?;
    let filter = match target {
        TargetPeriod::Month(month) => Filter::and(vec![
            Filter::gte(field, month.format("%Y-%m-%d").to_string()),
            Filter::lt(field, next_month_start(*month).format("%Y-%m-%d").to_string()),
        ]),
        TargetPeriod::Dates(dates) => Filter::is_in(
            field,
            dates.iter().map(|d| d.format("%Y-%m-%d").to_string()),
        ),
    };
    Some(filter)
}

fn row_registration(row: &Row) -> Option<i64> {
    match row.get("registration")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ==========================================
// ReconciliationEngine
// ==========================================
pub struct ReconciliationEngine {
    store: Arc<dyn RecordStore>,
    page_size: usize,
    cache: Mutex<Option<Arc<HashSet<i64>>>>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn RecordStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            cache: Mutex::new(None),
        }
    }

    /// 已有登记号集合（首次调用时分页读取，之后走缓存）
    #[instrument(skip(self))]
    pub async fn existing_registrations(&self) -> RepositoryResult<Arc<HashSet<i64>>> {
        let mut cache = self.cache.lock().await;
        if let Some(set) = cache.as_ref() {
            return Ok(Arc::clone(set));
        }

        let mut set = HashSet::new();
        let mut offset = 0;
        let mut pages = 0;
        loop {
            let query = SelectQuery::all()
                .order_by("registration", false)
                .range(offset, self.page_size);
            let rows = self.store.select(EMPLOYEE_COLLECTION, &query).await?;
            pages += 1;
            set.extend(rows.iter().filter_map(row_registration));

            // 短页即末页
            if rows.len() < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        info!(registrations = set.len(), pages, "已加载登记号集合");
        let set = Arc::new(set);
        *cache = Some(Arc::clone(&set));
        Ok(set)
    }

    /// 清空缓存（新会话或提交之后）
    pub async fn invalidate_cache(&self) {
        *self.cache.lock().await = None;
    }

    /// 期间冲突检测（只读，重复调用结果一致）
    #[instrument(skip(self), fields(kind = %kind, period = %target.key()))]
    pub async fn check_period_conflict(
        &self,
        kind: RecordKind,
        target: &TargetPeriod,
    ) -> RepositoryResult<bool> {
        let Some(filter) = period_filter(kind, target) else {
            return Ok(false);
        };
        let rows = self
            .store
            .select(kind.collection(), &SelectQuery::new(filter).range(0, 1))
            .await?;
        debug!(conflict = !rows.is_empty(), "期间冲突检测");
        Ok(!rows.is_empty())
    }

    /// 删除期间内全部记录
    ///
    /// # 返回
    /// - Ok(usize): 删除的记录数
    #[instrument(skip(self), fields(kind = %kind, period = %target.key()))]
    pub async fn delete_period(
        &self,
        kind: RecordKind,
        target: &TargetPeriod,
    ) -> RepositoryResult<usize> {
        let Some(filter) = period_filter(kind, target) else {
            return Ok(0);
        };
        let deleted = self.store.delete(kind.collection(), &filter).await?;
        info!(deleted, "期间记录已删除");
        Ok(deleted)
    }
}
