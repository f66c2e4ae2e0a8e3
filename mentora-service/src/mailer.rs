//! Client for the transactional mail provider.
//!
//! The provider exposes a single JSON endpoint; an empty API key turns
//! the client into a logging no-op so local development needs no account.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MailConfig;
use crate::error::{MailError, ServiceError, ServiceResult};

/// Mail provider client
pub struct MailClient {
    client: Client,
    config: MailConfig,
}

impl MailClient {
    /// Create a new mail client
    pub fn new(config: MailConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ServiceError::Mail(MailError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    /// Send a plain-text email
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> ServiceResult<()> {
        if self.config.api_key.is_empty() {
            debug!(to = %to, subject = %subject, "Mail disabled, skipping send");
            return Ok(());
        }

        let url = format!("{}/v1/messages", self.config.base_url);

        let request = SendMessageRequest {
            from: self.config.from_address.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            text: body.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ServiceError::Mail(MailError::Connection {
                    url: url.clone(),
                    source: e,
                })
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Mail(MailError::Rejected { status, message }));
        }

        info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

/// Mail provider request body
#[derive(Debug, Serialize)]
struct SendMessageRequest {
    from: String,
    to: String,
    subject: String,
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = SendMessageRequest {
            from: "no-reply@mentora.dev".to_string(),
            to: "student@example.com".to_string(),
            subject: "Welcome".to_string(),
            text: "Hello!".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""to":"student@example.com""#));
        assert!(json.contains(r#""subject":"Welcome""#));
    }

    #[test]
    fn test_disabled_client_is_noop() {
        let client = MailClient::new(MailConfig {
            base_url: "https://api.mail.example.com".to_string(),
            api_key: String::new(),
            from_address: "no-reply@mentora.dev".to_string(),
        })
        .unwrap();

        tokio_test::block_on(async {
            client.send("a@b.com", "hi", "body").await.unwrap();
        });
    }
}
