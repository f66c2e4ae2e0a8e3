//! Client for the payment gateway.
//!
//! Checkout sessions are created server-side; the client is redirected to
//! the returned URL. The gateway reports outcomes via a webhook signed
//! with HMAC-SHA256 over the raw body (signature base64url, no padding).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, ServiceError, ServiceResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Payment gateway client
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

/// A created checkout session
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A webhook event delivered by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: WebhookEventType,
    pub session_id: String,
}

/// Webhook event types we act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "checkout.completed")]
    CheckoutCompleted,
    #[serde(rename = "checkout.failed")]
    CheckoutFailed,
}

impl GatewayClient {
    /// Create a new gateway client
    pub fn new(config: GatewayConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::Gateway(GatewayError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    /// Create a checkout session for a payment
    pub async fn create_checkout_session(
        &self,
        payment_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> ServiceResult<CheckoutSession> {
        let url = format!("{}/v1/checkout/sessions", self.config.base_url);

        let request = CreateSessionRequest {
            amount_cents,
            currency: currency.to_string(),
            reference: payment_id.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ServiceError::Gateway(GatewayError::Connection {
                    url: url.clone(),
                    source: e,
                })
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Gateway(GatewayError::Rejected {
                status,
                message,
            }));
        }

        let body = response.text().await.unwrap_or_default();
        let session: CheckoutSession = serde_json::from_str(&body)
            .map_err(|e| ServiceError::Gateway(GatewayError::InvalidResponse { source: e }))?;

        Ok(session)
    }

    /// Verify a webhook delivery against the configured secret and parse it
    pub fn parse_webhook(&self, body: &[u8], signature: &str) -> ServiceResult<WebhookEvent> {
        verify_signature(self.config.webhook_secret.as_bytes(), body, signature)?;

        serde_json::from_slice(body)
            .map_err(|e| ServiceError::Gateway(GatewayError::InvalidResponse { source: e }))
    }
}

/// Verify an HMAC-SHA256 signature (base64url, no padding) over `body`.
/// Uses a constant-time comparison.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> ServiceResult<()> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| {
        ServiceError::Internal {
            message: "Webhook secret not usable as HMAC key".to_string(),
        }
    })?;
    mac.update(body);

    let expected = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| ServiceError::Gateway(GatewayError::InvalidSignature))?;

    mac.verify_slice(&expected)
        .map_err(|_| ServiceError::Gateway(GatewayError::InvalidSignature))?;

    Ok(())
}

/// Sign a body the way the gateway does
#[cfg(test)]
pub fn sign_body(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Checkout session request body
#[derive(Debug, Serialize)]
struct CreateSessionRequest {
    amount_cents: i64,
    currency: String,
    reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_round_trip() {
        let secret = b"whsec_test";
        let body = br#"{"type":"checkout.completed","session_id":"cs_1"}"#;

        let signature = sign_body(secret, body);
        assert!(verify_signature(secret, body, &signature).is_ok());

        // Tampered body fails
        let tampered = br#"{"type":"checkout.completed","session_id":"cs_2"}"#;
        assert!(verify_signature(secret, tampered, &signature).is_err());

        // Wrong secret fails
        assert!(verify_signature(b"other", body, &signature).is_err());

        // Garbage signature fails without panicking
        assert!(verify_signature(secret, body, "!!not-base64!!").is_err());
    }

    #[test]
    fn test_webhook_event_deserialization() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"type":"checkout.completed","session_id":"cs_1"}"#).unwrap();
        assert_eq!(event.event_type, WebhookEventType::CheckoutCompleted);
        assert_eq!(event.session_id, "cs_1");

        let event: WebhookEvent =
            serde_json::from_str(r#"{"type":"checkout.failed","session_id":"cs_2"}"#).unwrap();
        assert_eq!(event.event_type, WebhookEventType::CheckoutFailed);

        // Unknown event types are rejected at parse time
        assert!(
            serde_json::from_str::<WebhookEvent>(r#"{"type":"refund.created","session_id":"x"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_checkout_session_deserialization() {
        let session: CheckoutSession =
            serde_json::from_str(r#"{"id":"cs_1","url":"https://pay.example.com/cs_1"}"#).unwrap();
        assert_eq!(session.id, "cs_1");
        assert!(session.url.starts_with("https://"));
    }
}
