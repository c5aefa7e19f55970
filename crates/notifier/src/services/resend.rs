//! Resend HTTP API client, used for both email delivery and audience contacts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::error::{IntegrationError, Result};
use crate::services::audience::{AudienceSync, ContactUpsert};
use crate::services::email::{EmailMessage, EmailReceipt, EmailSender};

const DEFAULT_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct ContactRequest<'a> {
    email: &'a str,
    first_name: &'a str,
    unsubscribed: bool,
}

/// Resend client.
#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl ResendClient {
    /// Creates a client whose requests give up after `timeout`.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Points the client at another API root.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn check(response: Response) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IntegrationError::Rejected(
                "Resend rejected the API key".to_string(),
            )),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(IntegrationError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    #[tracing::instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> Result<EmailReceipt> {
        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let receipt = Self::check(response).await?.json::<EmailReceipt>().await?;
        Ok(receipt)
    }
}

#[async_trait]
impl AudienceSync for ResendClient {
    #[tracing::instrument(skip(self, contact), fields(audience_id = %contact.audience_id))]
    async fn upsert_contact(&self, contact: ContactUpsert) -> Result<()> {
        let body = ContactRequest {
            email: &contact.email,
            first_name: &contact.first_name,
            unsubscribed: contact.unsubscribed,
        };
        let response = self
            .client
            .post(format!(
                "{}/audiences/{}/contacts",
                self.api_url, contact.audience_id
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}
