use crate::core::{Backend, ConfigProvider, Query};
use crate::utils::error::{ComplianceError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// PostgREST client for the hosted backend (`/rest/v1`).
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;

        Ok(Self {
            client,
            base_url: config.backend_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn checked(&self, table: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);

        tracing::debug!("{} responded {}: {}", table, status, message);

        if status == StatusCode::CONFLICT {
            return Err(ComplianceError::Conflict {
                table: table.to_string(),
                message,
            });
        }
        Err(ComplianceError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    async fn single_row(&self, table: &str, id: Option<&str>, response: Response) -> Result<Value> {
        let rows: Value = self.checked(table, response).await?.json().await?;
        let row = match rows {
            Value::Array(items) => items.into_iter().next(),
            other => Some(other),
        };

        row.ok_or_else(|| match id {
            Some(id) => ComplianceError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            },
            None => ComplianceError::Backend {
                status: 200,
                message: format!("{} returned no representation", table),
            },
        })
    }
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        params.push((
            filter.column.clone(),
            format!("{}.{}", filter.op.as_str(), filter.value),
        ));
    }
    if let Some((column, ascending)) = &query.order_by {
        let direction = if *ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        tracing::debug!("GET {} {:?}", table, query);
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query_params(query))
            .send()
            .await?;

        let body: Value = self.checked(table, response).await?.json().await?;
        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(ComplianceError::Backend {
                status: 200,
                message: format!("expected a row array from {}, got {}", table, other),
            }),
        }
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let response = self
            .authorized(self.client.head(self.table_url(table)))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = self.checked(table, response).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| ComplianceError::Backend {
                status: response.status().as_u16(),
                message: format!("{} did not report an exact count", table),
            })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        self.single_row(table, None, response).await
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
        let response = self
            .authorized(self.client.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        self.single_row(table, Some(id), response).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let response = self
            .authorized(self.client.delete(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        self.checked(table, response).await?;
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let response = self.authorized(self.client.post(url)).json(&args).send().await?;
        Ok(self.checked(function, response).await?.json().await?)
    }
}
