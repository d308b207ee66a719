// ==========================================
// 人事薪资后台 - SQLite 记录存储
// ==========================================
// 职责: 以 JSON 文档形式保存各集合记录，json_extract 过滤
// 约束: 所有查询使用参数化，字段名经白名单校验
// ==========================================

use crate::db::{open_in_memory_connection, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{validate_field, Filter, RecordStore, Row, SelectQuery};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 创建新的存储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = open_in_memory_connection()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建实例（与配置管理器共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

fn json_path(field: &str) -> RepositoryResult<SqlValue> {
    validate_field(field)?;
    Ok(SqlValue::Text(format!("$.\"{}\"", field)))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Filter → WHERE 子句（参数追加到 params）
fn build_where(filter: &Filter, params: &mut Vec<SqlValue>) -> RepositoryResult<String> {
    let clause = match filter {
        Filter::All => "1=1".to_string(),
        Filter::Eq(field, value) => {
            params.push(json_path(field)?);
            params.push(to_sql_value(value));
            "json_extract(data, ?) = ?".to_string()
        }
        Filter::In(field, values) => {
            if values.is_empty() {
                return Ok("0=1".to_string());
            }
            params.push(json_path(field)?);
            params.extend(values.iter().map(to_sql_value));
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("json_extract(data, ?) IN ({})", placeholders)
        }
        Filter::Gte(field, value) => {
            params.push(json_path(field)?);
            params.push(to_sql_value(value));
            "json_extract(data, ?) >= ?".to_string()
        }
        Filter::Lt(field, value) => {
            params.push(json_path(field)?);
            params.push(to_sql_value(value));
            "json_extract(data, ?) < ?".to_string()
        }
        Filter::And(list) => {
            if list.is_empty() {
                return Ok("1=1".to_string());
            }
            let parts = list
                .iter()
                .map(|f| build_where(f, params).map(|c| format!("({})", c)))
                .collect::<RepositoryResult<Vec<_>>>()?;
            parts.join(" AND ")
        }
    };
    Ok(clause)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn select(&self, collection: &str, query: &SelectQuery) -> RepositoryResult<Vec<Row>> {
        let mut params = vec![SqlValue::Text(collection.to_string())];
        let where_clause = build_where(&query.filter, &mut params)?;

        let mut sql = format!(
            "SELECT data FROM records WHERE collection = ? AND ({})",
            where_clause
        );
        match &query.order {
            Some((field, descending)) => {
                params.push(json_path(field)?);
                let dir = if *descending { "DESC" } else { "ASC" };
                sql.push_str(&format!(" ORDER BY json_extract(data, ?) {dir}, id {dir}"));
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }
        if let Some((offset, limit)) = query.range {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlValue::Integer(limit as i64));
            params.push(SqlValue::Integer(offset as i64));
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let raw: Vec<String> = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        let rows = raw
            .into_iter()
            .map(|text| -> RepositoryResult<Row> {
                match serde_json::from_str::<Value>(&text)? {
                    Value::Object(map) => Ok(map),
                    _ => Ok(Row::new()),
                }
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        debug!(collection, rows = rows.len(), "select");
        Ok(rows)
    }

    async fn insert(&self, collection: &str, rows: Vec<Row>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare("INSERT INTO records (collection, data) VALUES (?1, ?2)")?;
            for row in rows {
                let data = serde_json::to_string(&Value::Object(row))?;
                count += stmt.execute(rusqlite::params![collection, data])?;
            }
        }
        tx.commit()?;

        debug!(collection, count, "insert");
        Ok(count)
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Row,
    ) -> RepositoryResult<usize> {
        let mut params = vec![
            SqlValue::Text(serde_json::to_string(&Value::Object(patch))?),
            SqlValue::Text(collection.to_string()),
        ];
        let where_clause = build_where(filter, &mut params)?;
        let sql = format!(
            "UPDATE records SET data = json_patch(data, ?) WHERE collection = ? AND ({})",
            where_clause
        );

        let conn = self.get_conn()?;
        let count = conn.execute(&sql, params_from_iter(params.iter()))?;
        debug!(collection, count, "update");
        Ok(count)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> RepositoryResult<usize> {
        let mut params = vec![SqlValue::Text(collection.to_string())];
        let where_clause = build_where(filter, &mut params)?;
        let sql = format!(
            "DELETE FROM records WHERE collection = ? AND ({})",
            where_clause
        );

        let conn = self.get_conn()?;
        let count = conn.execute(&sql, params_from_iter(params.iter()))?;
        debug!(collection, count, "delete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    async fn seeded() -> SqliteRecordStore {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store
            .insert(
                "payroll",
                vec![
                    row(json!({"registration": 100200, "competence": "2025-02-01", "value": 10.5})),
                    row(json!({"registration": 100200, "competence": "2025-03-01", "value": 20.0})),
                    row(json!({"registration": 100300, "competence": "2025-03-01", "value": 30.0})),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_month_range_filter() {
        let store = seeded().await;
        let filter = Filter::and(vec![
            Filter::gte("competence", "2025-03-01"),
            Filter::lt("competence", "2025-04-01"),
        ]);
        let rows = store.select("payroll", &SelectQuery::new(filter)).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_range_and_order() {
        let store = seeded().await;
        let query = SelectQuery::all().order_by("value", true).range(0, 2);
        let rows = store.select("payroll", &query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["value"], json!(30.0));

        let next = store
            .select("payroll", &SelectQuery::all().order_by("value", true).range(2, 2))
            .await
            .unwrap();
        assert_eq!(next.len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = seeded().await;
        let updated = store
            .update(
                "payroll",
                &Filter::eq("registration", 100300),
                row(json!({"value": 99.0, "updated_by": "ana"})),
            )
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let rows = store
            .select("payroll", &SelectQuery::new(Filter::eq("registration", 100300)))
            .await
            .unwrap();
        assert_eq!(rows[0]["value"], json!(99.0));
        assert_eq!(rows[0]["competence"], json!("2025-03-01"));
        assert_eq!(rows[0]["updated_by"], json!("ana"));
    }

    #[tokio::test]
    async fn test_delete_returns_count_and_scopes_collection() {
        let store = seeded().await;
        store
            .insert("overtime", vec![row(json!({"registration": 100200, "date": "2025-03-10"}))])
            .await
            .unwrap();

        let deleted = store
            .delete("payroll", &Filter::is_in("competence", ["2025-03-01"]))
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let overtime = store.select("overtime", &SelectQuery::all()).await.unwrap();
        assert_eq!(overtime.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_field_rejected() {
        let store = seeded().await;
        let result = store
            .select("payroll", &SelectQuery::new(Filter::eq("x') OR 1=1 --", 1)))
            .await;
        assert!(matches!(result, Err(RepositoryError::InvalidField(_))));
    }
}
