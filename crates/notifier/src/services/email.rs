//! Email sender trait, in-memory and console implementations.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{IntegrationError, Result};

/// An outbound transactional email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Provider acknowledgement of an accepted email.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailReceipt {
    pub id: String,
}

/// Trait for transactional email delivery.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Hands `message` to the provider.
    async fn send(&self, message: EmailMessage) -> Result<EmailReceipt>;
}

#[async_trait]
impl<T: EmailSender + ?Sized> EmailSender for Arc<T> {
    async fn send(&self, message: EmailMessage) -> Result<EmailReceipt> {
        (**self).send(message).await
    }
}

#[derive(Debug, Default)]
struct InMemoryEmailState {
    sent: Vec<EmailMessage>,
    attempts: usize,
    fail_on_send: bool,
    delay: Option<Duration>,
}

/// In-memory email sender for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailSender {
    state: Arc<RwLock<InMemoryEmailState>>,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sender to reject every send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).fail_on_send = fail;
    }

    /// Makes every send wait `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).delay = delay;
    }

    /// Emails accepted so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).sent.len()
    }

    /// Sends attempted, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).attempts
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<EmailReceipt> {
        let delay = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.attempts += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_send {
            return Err(IntegrationError::Rejected("Email provider unavailable".to_string()));
        }
        state.sent.push(message);
        Ok(EmailReceipt {
            id: format!("EMAIL-{:04}", state.sent.len()),
        })
    }
}

/// Email sender that logs messages instead of delivering them.
///
/// Used when no provider API key is configured.
#[derive(Debug, Clone, Default)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for ConsoleEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<EmailReceipt> {
        let id = format!("console-{}", uuid::Uuid::new_v4());
        tracing::info!(
            email_id = %id,
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            bytes = message.html.len(),
            "email not sent, no provider configured"
        );
        tracing::debug!(html = %message.html, "email body");
        Ok(EmailReceipt { id })
    }
}
