// ==========================================
// 人事薪资后台 - 远程 REST 记录存储
// ==========================================
// 协议: PostgREST 风格查询串（field=eq.value / in.(a,b) / gte. / lt.）
// 分页: Range 头；删除计数: Prefer: count=exact + Content-Range
// 约束: 不做自动重试，不设超时（由操作员重新触发）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{validate_field, Filter, RecordStore, Row, SelectQuery};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE, RANGE};
use serde_json::Value;
use tracing::debug;

pub struct RestRecordStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestRecordStore {
    /// # 参数
    /// - base_url: REST 根地址（如 https://host/rest/v1）
    /// - api_key: 可选的 API key（同时用作 Bearer token）
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, collection: &str) -> RepositoryResult<String> {
        validate_field(collection)?;
        Ok(format!("{}/{}", self.base_url, collection))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("apikey", key.as_str()).bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> RepositoryResult<reqwest::Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RepositoryError::RemoteStatus {
                status: status.as_u16(),
                message: remote_message(&body),
            });
        }
        Ok(resp)
    }
}

/// 远程错误体中的 message 字段（没有则原样返回）
fn remote_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Filter → 查询参数
pub fn filter_params(filter: &Filter) -> RepositoryResult<Vec<(String, String)>> {
    let mut params = Vec::new();
    collect_params(filter, &mut params)?;
    Ok(params)
}

fn collect_params(filter: &Filter, out: &mut Vec<(String, String)>) -> RepositoryResult<()> {
    match filter {
        Filter::All => {}
        Filter::Eq(field, value) => {
            validate_field(field)?;
            out.push((field.clone(), format!("eq.{}", render_value(value))));
        }
        Filter::In(field, values) => {
            validate_field(field)?;
            let list = values.iter().map(render_value).collect::<Vec<_>>().join(",");
            out.push((field.clone(), format!("in.({})", list)));
        }
        Filter::Gte(field, value) => {
            validate_field(field)?;
            out.push((field.clone(), format!("gte.{}", render_value(value))));
        }
        Filter::Lt(field, value) => {
            validate_field(field)?;
            out.push((field.clone(), format!("lt.{}", render_value(value))));
        }
        Filter::And(list) => {
            for f in list {
                collect_params(f, out)?;
            }
        }
    }
    Ok(())
}

/// SelectQuery → (查询参数, Range 头)
pub fn select_params(
    query: &SelectQuery,
) -> RepositoryResult<(Vec<(String, String)>, Option<String>)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filter)?);
    if let Some((field, descending)) = &query.order {
        validate_field(field)?;
        let dir = if *descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", field, dir)));
    }
    let range = query
        .range
        .filter(|(_, limit)| *limit > 0)
        .map(|(offset, limit)| format!("{}-{}", offset, offset + limit - 1));
    Ok((params, range))
}

/// Content-Range "0-4/5" 或 "*/5" → 5
fn parse_content_range_total(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit('/').next())
        .and_then(|total| total.parse().ok())
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn select(&self, collection: &str, query: &SelectQuery) -> RepositoryResult<Vec<Row>> {
        let (params, range) = select_params(query)?;
        let mut builder = self
            .request(reqwest::Method::GET, &self.url(collection)?)
            .query(&params);
        if let Some(range) = range {
            builder = builder
                .header("Range-Unit", "items")
                .header(RANGE, range);
        }

        let rows: Vec<Row> = self.send(builder).await?.json().await?;
        debug!(collection, rows = rows.len(), "remote select");
        Ok(rows)
    }

    async fn insert(&self, collection: &str, rows: Vec<Row>) -> RepositoryResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let builder = self
            .request(reqwest::Method::POST, &self.url(collection)?)
            .header("Prefer", "return=representation")
            .json(&rows);

        let created: Vec<Row> = self.send(builder).await?.json().await?;
        debug!(collection, count = created.len(), "remote insert");
        Ok(created.len())
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Row,
    ) -> RepositoryResult<usize> {
        let builder = self
            .request(reqwest::Method::PATCH, &self.url(collection)?)
            .query(&filter_params(filter)?)
            .header("Prefer", "return=representation")
            .json(&patch);

        let updated: Vec<Row> = self.send(builder).await?.json().await?;
        debug!(collection, count = updated.len(), "remote update");
        Ok(updated.len())
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> RepositoryResult<usize> {
        let builder = self
            .request(reqwest::Method::DELETE, &self.url(collection)?)
            .query(&filter_params(filter)?)
            .header("Prefer", "count=exact");

        let resp = self.send(builder).await?;
        let count = parse_content_range_total(resp.headers()).unwrap_or(0);
        debug!(collection, count, "remote delete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_month_filter_params() {
        let filter = Filter::and(vec![
            Filter::gte("competence", "2025-03-01"),
            Filter::lt("competence", "2025-04-01"),
        ]);
        let params = filter_params(&filter).unwrap();
        assert_eq!(
            params,
            vec![
                ("competence".to_string(), "gte.2025-03-01".to_string()),
                ("competence".to_string(), "lt.2025-04-01".to_string()),
            ]
        );
    }

    #[test]
    fn test_in_filter_and_range() {
        let query = SelectQuery::new(Filter::is_in("date", ["2025-03-10", "2025-03-11"]))
            .order_by("registration", false)
            .range(1000, 1000);
        let (params, range) = select_params(&query).unwrap();
        assert!(params.contains(&("date".to_string(), "in.(2025-03-10,2025-03-11)".to_string())));
        assert!(params.contains(&("order".to_string(), "registration.asc".to_string())));
        assert_eq!(range.as_deref(), Some("1000-1999"));
    }

    #[test]
    fn test_content_range_total() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_RANGE, HeaderValue::from_static("*/12"));
        assert_eq!(parse_content_range_total(&headers), Some(12));
    }

    #[test]
    fn test_remote_message_extraction() {
        assert_eq!(remote_message(r#"{"message":"permission denied"}"#), "permission denied");
        assert_eq!(remote_message("bad gateway"), "bad gateway");
    }
}
