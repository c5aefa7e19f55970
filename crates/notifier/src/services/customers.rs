//! Customer record writes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::SubjectId;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{IntegrationError, Result};

/// Fields to overwrite on a customer. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }
}

/// Trait for updating customer records in the commerce platform.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn patch(&self, customer_id: &SubjectId, patch: &CustomerPatch) -> Result<()>;
}

#[async_trait]
impl<T: CustomerStore + ?Sized> CustomerStore for Arc<T> {
    async fn patch(&self, customer_id: &SubjectId, patch: &CustomerPatch) -> Result<()> {
        (**self).patch(customer_id, patch).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCustomerState {
    patches: HashMap<SubjectId, Vec<CustomerPatch>>,
    fail_on_patch: bool,
}

/// In-memory customer store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerStore {
    state: Arc<RwLock<InMemoryCustomerState>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to reject every patch.
    pub fn set_fail_on_patch(&self, fail: bool) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).fail_on_patch = fail;
    }

    /// Patches applied to `customer_id`, oldest first.
    pub fn patches_for(&self, customer_id: &SubjectId) -> Vec<CustomerPatch> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .patches
            .get(customer_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total patches applied across all customers.
    pub fn patch_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .patches
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn patch(&self, customer_id: &SubjectId, patch: &CustomerPatch) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_patch {
            return Err(IntegrationError::Rejected("Customer store unavailable".to_string()));
        }
        state
            .patches
            .entry(customer_id.clone())
            .or_default()
            .push(patch.clone());
        Ok(())
    }
}

/// Customer store backed by the commerce platform's HTTP API.
///
/// Sends `POST {base_url}/customers/{id}` with the patch as the JSON body.
#[derive(Clone)]
pub struct HttpCustomerStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpCustomerStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn customer_url(&self, customer_id: &SubjectId) -> String {
        format!("{}/customers/{}", self.base_url, customer_id)
    }
}

#[async_trait]
impl CustomerStore for HttpCustomerStore {
    #[tracing::instrument(skip(self, patch), fields(customer_id = %customer_id))]
    async fn patch(&self, customer_id: &SubjectId, patch: &CustomerPatch) -> Result<()> {
        let mut request = self.client.post(self.customer_url(customer_id)).json(patch);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
