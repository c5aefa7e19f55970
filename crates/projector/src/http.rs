//! Data source backed by the commerce platform's HTTP query endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::contract::Entity;
use crate::error::ProjectorError;
use crate::source::{DataSource, QueryFilter};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    entity: Entity,
    fields: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a QueryFilter>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<Value>,
}

/// Posts `{entity, fields, filters}` to `{base_url}/query` and reads `{"data": [...]}`.
#[derive(Clone)]
pub struct HttpDataSource {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpDataSource {
    /// Creates a data source whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every query.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    #[tracing::instrument(skip(self, fields), fields(entity = %entity))]
    async fn query(
        &self,
        entity: Entity,
        fields: &[&str],
        filter: &QueryFilter,
    ) -> Result<Vec<Value>> {
        let body = QueryRequest {
            entity,
            fields,
            filters: match filter {
                QueryFilter::All => None,
                id => Some(id),
            },
        };

        let mut request = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProjectorError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.data)
    }
}
