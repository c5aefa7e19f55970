//! Newsletter audience trait and in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{IntegrationError, Result};

/// A contact to create or update in a mailing audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpsert {
    pub email: String,
    pub first_name: String,
    pub unsubscribed: bool,
    pub audience_id: String,
}

/// Trait for CRM/audience synchronization.
#[async_trait]
pub trait AudienceSync: Send + Sync {
    async fn upsert_contact(&self, contact: ContactUpsert) -> Result<()>;
}

#[async_trait]
impl<T: AudienceSync + ?Sized> AudienceSync for Arc<T> {
    async fn upsert_contact(&self, contact: ContactUpsert) -> Result<()> {
        (**self).upsert_contact(contact).await
    }
}

#[derive(Debug, Default)]
struct InMemoryAudienceState {
    contacts: Vec<ContactUpsert>,
    attempts: usize,
    fail_on_upsert: bool,
}

/// In-memory audience for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAudienceSync {
    state: Arc<RwLock<InMemoryAudienceState>>,
}

impl InMemoryAudienceSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the audience to reject every upsert.
    pub fn set_fail_on_upsert(&self, fail: bool) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).fail_on_upsert = fail;
    }

    pub fn contacts(&self) -> Vec<ContactUpsert> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).contacts.clone()
    }

    /// Upserts attempted, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).attempts
    }
}

#[async_trait]
impl AudienceSync for InMemoryAudienceSync {
    async fn upsert_contact(&self, contact: ContactUpsert) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.attempts += 1;
        if state.fail_on_upsert {
            return Err(IntegrationError::Rejected("Audience service unavailable".to_string()));
        }
        state.contacts.retain(|c| !(c.email == contact.email && c.audience_id == contact.audience_id));
        state.contacts.push(contact);
        Ok(())
    }
}

/// Audience sync used when no newsletter audience is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAudienceSync;

#[async_trait]
impl AudienceSync for NoopAudienceSync {
    async fn upsert_contact(&self, contact: ContactUpsert) -> Result<()> {
        tracing::debug!(audience_id = %contact.audience_id, "audience sync disabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(first_name: &str) -> ContactUpsert {
        ContactUpsert {
            email: "a@b.com".into(),
            first_name: first_name.into(),
            unsubscribed: false,
            audience_id: "aud_1".into(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_contact() {
        let audience = InMemoryAudienceSync::new();
        audience.upsert_contact(contact("Guest")).await.unwrap();
        audience.upsert_contact(contact("Sam")).await.unwrap();

        let contacts = audience.contacts();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].first_name, "Sam");
        assert_eq!(audience.attempts(), 2);
    }

    #[tokio::test]
    async fn test_fail_on_upsert() {
        let audience = InMemoryAudienceSync::new();
        audience.set_fail_on_upsert(true);
        assert!(audience.upsert_contact(contact("Sam")).await.is_err());
        assert!(audience.contacts().is_empty());
    }
}
