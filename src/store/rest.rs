//! REST backend speaking PostgREST conventions (the hosted store exposes
//! its tables at `/rest/v1/<collection>` with `field=op.value` filters).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder, StatusCode,
};
use serde_json::Value;
use tracing::debug;

use super::{Filter, QueryOptions, RecordStore};
use crate::errors::StoreError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    /// Builds a client for the hosted store. `base_url` is the project URL
    /// without the `/rest/v1` suffix; `api_key` is sent both as `apikey`
    /// and as a bearer token, as the hosted store expects. A key that
    /// cannot be carried in an HTTP header is a configuration error here,
    /// not a stream of 401s later.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", api_key))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection)
    }

    fn apply_filters(mut req: RequestBuilder, filters: &[Filter]) -> RequestBuilder {
        for filter in filters {
            req = req.query(&[(
                filter.field.as_str(),
                format!("{}.{}", filter.op.token(), param_literal(&filter.value)),
            )]);
        }
        req
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // Mutations answered with 204 No Content carry no row set.
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: Value = serde_json::from_str(&body)?;
        match parsed {
            Value::Array(rows) => Ok(rows),
            other => Ok(vec![other]),
        }
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(raw).map_err(|_| {
        StoreError::Config(
            "store API key contains bytes not allowed in an HTTP header".to_string(),
        )
    })
}

/// Renders a filter value as a PostgREST query-parameter literal
/// (unquoted strings, plain numbers and booleans).
fn param_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        opts: &QueryOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let mut req = self
            .client
            .request(Method::GET, self.collection_url(collection))
            .query(&[("select", "*")]);
        req = Self::apply_filters(req, filters);
        if let Some(field) = &opts.order_by {
            let direction = if opts.descending { "desc" } else { "asc" };
            req = req.query(&[("order", format!("{}.{}", field, direction))]);
        }
        if let Some(limit) = opts.limit {
            req = req.query(&[("limit", limit.to_string())]);
        }
        debug!(collection, filters = filters.len(), "store query");
        self.execute(req).await
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Vec<Value>, StoreError> {
        let req = self
            .client
            .request(Method::POST, self.collection_url(collection))
            .header("Prefer", "return=representation")
            .json(&record);
        debug!(collection, "store insert");
        self.execute(req).await
    }

    async fn update(
        &self,
        collection: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        let mut req = self
            .client
            .request(Method::PATCH, self.collection_url(collection))
            .header("Prefer", "return=representation")
            .json(&patch);
        req = Self::apply_filters(req, filters);
        debug!(collection, filters = filters.len(), "store update");
        self.execute(req).await
    }

    async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
        let mut req = self
            .client
            .request(Method::DELETE, self.collection_url(collection))
            .header("Prefer", "return=representation");
        req = Self::apply_filters(req, filters);
        debug!(collection, filters = filters.len(), "store delete");
        self.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_literals_render_unquoted() {
        assert_eq!(param_literal(&json!("BIO-PPE-0001")), "BIO-PPE-0001");
    }

    #[test]
    fn numeric_literals_render_plain() {
        assert_eq!(param_literal(&json!(100)), "100");
        assert_eq!(param_literal(&json!(true)), "true");
    }

    #[test]
    fn well_formed_key_builds() {
        assert!(RestStore::new("https://store.example", "service-key").is_ok());
    }

    #[test]
    fn key_with_control_bytes_rejected_at_construction() {
        let err = RestStore::new("https://store.example", "key\nbroken").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
