//! Client for the embedding provider.
//!
//! Talks to an Ollama-compatible embeddings endpoint. Tutor profile
//! vectors and recommendation query vectors both come from here.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::config::EmbeddingsConfig;
use crate::error::{EmbeddingError, ServiceError, ServiceResult};

/// Embedding provider client
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(config: &EmbeddingsConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::Embedding(EmbeddingError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    /// Check if the embedding provider is reachable
    pub async fn health_check(&self) -> ServiceResult<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(error = %e, "Embedding provider health check failed");
                Ok(false)
            }
        }
    }

    /// Generate an embedding for the given text
    pub async fn embed_text(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ServiceError::Embedding(EmbeddingError::Connection {
                    url: url.clone(),
                    source: e,
                })
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();

            if message.contains("model")
                && (message.contains("not found") || message.contains("does not exist"))
            {
                return Err(ServiceError::Embedding(EmbeddingError::ModelNotFound {
                    model: self.model.clone(),
                }));
            }

            return Err(ServiceError::Embedding(EmbeddingError::Generation {
                status,
                message,
            }));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            ServiceError::Embedding(EmbeddingError::Generation {
                status: 200,
                message: e.to_string(),
            })
        })?;

        Ok(embedding_response.embedding)
    }
}

/// Embedding request body
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

/// Embedding response body
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = EmbeddingRequest {
            model: "nomic-embed-text".to_string(),
            prompt: "algebra tutoring".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""model":"nomic-embed-text""#));
        assert!(json.contains(r#""prompt":"algebra tutoring""#));
    }

    #[test]
    fn test_response_deserialization() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"embedding":[0.1,-0.2,0.3]}"#).unwrap();
        assert_eq!(response.embedding, vec![0.1, -0.2, 0.3]);
    }
}
