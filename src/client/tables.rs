use super::TablesApi;
use super::http::NextcloudHttp;
use crate::error::{NextcloudError, NextcloudResult};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Row values keyed by column id
pub type RowData = BTreeMap<String, Value>;

pub struct TablesClient {
    http: Arc<NextcloudHttp>,
}

impl TablesClient {
    pub fn new(http: Arc<NextcloudHttp>) -> Self {
        Self { http }
    }

    /// OCS v2 endpoints of the Tables app
    fn ocs_url(&self, tail: &[&str]) -> NextcloudResult<reqwest::Url> {
        let mut segments = vec!["ocs", "v2.php", "apps", "tables", "api", "2"];
        segments.extend_from_slice(tail);
        self.http.url(&segments)
    }

    /// Plain JSON v1 endpoints of the Tables app
    fn api_url(&self, tail: &[&str]) -> NextcloudResult<reqwest::Url> {
        let mut segments = vec!["index.php", "apps", "tables", "api", "1"];
        segments.extend_from_slice(tail);
        self.http.url(&segments)
    }
}

fn into_list(value: Value) -> NextcloudResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(NextcloudError::InvalidResponse(format!(
            "expected a JSON array, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl TablesApi for TablesClient {
    async fn list_tables(&self) -> NextcloudResult<Vec<Value>> {
        let url = self.ocs_url(&["tables"])?;
        into_list(self.http.ocs(self.http.request(Method::GET, url)).await?)
    }

    async fn get_schema(&self, table_id: i64) -> NextcloudResult<Value> {
        let id = table_id.to_string();
        let url = self.ocs_url(&["tables", "scheme", &id])?;
        self.http.ocs(self.http.request(Method::GET, url)).await
    }

    async fn read_table(
        &self,
        table_id: i64,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> NextcloudResult<Vec<Value>> {
        let id = table_id.to_string();
        let url = self.api_url(&["tables", &id, "rows"])?;
        let mut request = self.http.request(Method::GET, url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }
        into_list(self.http.send_json(request).await?)
    }

    async fn insert_row(&self, table_id: i64, data: &RowData) -> NextcloudResult<Value> {
        let id = table_id.to_string();
        let url = self.api_url(&["tables", &id, "rows"])?;
        self.http
            .send_json(self.http.request(Method::POST, url).json(&json!({ "data": data })))
            .await
    }

    async fn update_row(&self, row_id: i64, data: &RowData) -> NextcloudResult<Value> {
        let id = row_id.to_string();
        let url = self.api_url(&["rows", &id])?;
        self.http
            .send_json(self.http.request(Method::PUT, url).json(&json!({ "data": data })))
            .await
    }

    async fn delete_row(&self, row_id: i64) -> NextcloudResult<Value> {
        let id = row_id.to_string();
        let url = self.api_url(&["rows", &id])?;
        self.http
            .send_json(self.http.request(Method::DELETE, url))
            .await
    }
}
