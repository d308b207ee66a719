// ==========================================
// 人事薪资后台 - 记录存储 Trait
// ==========================================
// 职责: 命名集合上的通用 CRUD（过滤 + 分页 + 排序）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// 一条记录（JSON 对象）
pub type Row = serde_json::Map<String, Value>;

// ==========================================
// Filter - 过滤条件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    Gte(String, Value),
    Lt(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Filter::Lt(field.to_string(), value.into())
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// 过滤条件涉及的字段名
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Filter::All => Vec::new(),
            Filter::Eq(f, _) | Filter::In(f, _) | Filter::Gte(f, _) | Filter::Lt(f, _) => {
                vec![f.as_str()]
            }
            Filter::And(list) => list.iter().flat_map(|f| f.fields()).collect(),
        }
    }
}

/// 字段名仅允许字母、数字、下划线
pub fn validate_field(field: &str) -> RepositoryResult<()> {
    if !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(RepositoryError::InvalidField(field.to_string()))
    }
}

// ==========================================
// SelectQuery - 查询描述
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub filter: Filter,
    /// (offset, limit)
    pub range: Option<(usize, usize)>,
    /// (字段, 是否降序)
    pub order: Option<(String, bool)>,
}

impl SelectQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            range: None,
            order: None,
        }
    }

    pub fn all() -> Self {
        Self::new(Filter::All)
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.range = Some((offset, limit));
        self
    }

    pub fn order_by(mut self, field: &str, descending: bool) -> Self {
        self.order = Some((field.to_string(), descending));
        self
    }
}

// ==========================================
// RecordStore Trait
// ==========================================
// 实现者: SqliteRecordStore（本地）, RestRecordStore（远程 API）
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 查询集合
    async fn select(&self, collection: &str, query: &SelectQuery) -> RepositoryResult<Vec<Row>>;

    /// 批量插入
    ///
    /// # 返回
    /// - Ok(usize): 创建的记录数
    async fn insert(&self, collection: &str, rows: Vec<Row>) -> RepositoryResult<usize>;

    /// 按条件合并更新（patch 中的字段覆盖原值）
    async fn update(&self, collection: &str, filter: &Filter, patch: Row)
        -> RepositoryResult<usize>;

    /// 按条件删除
    ///
    /// # 返回
    /// - Ok(usize): 删除的记录数
    async fn delete(&self, collection: &str, filter: &Filter) -> RepositoryResult<usize>;
}

/// 类型化记录 → Row
pub fn to_row<T: Serialize>(record: &T) -> RepositoryResult<Row> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::SerializationError(format!(
            "expected object, got {}",
            other
        ))),
    }
}

/// Row → 类型化记录
pub fn from_row<T: DeserializeOwned>(row: Row) -> RepositoryResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_field() {
        assert!(validate_field("competence").is_ok());
        assert!(validate_field("303").is_ok());
        assert!(validate_field("a.b").is_err());
        assert!(validate_field("").is_err());
    }

    #[test]
    fn test_filter_fields() {
        let filter = Filter::and(vec![
            Filter::gte("competence", "2025-03-01"),
            Filter::lt("competence", "2025-04-01"),
        ]);
        assert_eq!(filter.fields(), vec!["competence", "competence"]);
    }
}
