//! HTTP embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Works against local inference servers (e.g. Infinity) serving a joint
//! text/image model. No authentication required for local deployments; an
//! optional API key is sent as a bearer token when configured.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::embedding::{EmbeddingProvider, ImageInput};
use crate::error::{EngineError, EngineResult};
use crate::math::l2_normalize_in_place;

/// Embedding provider backed by an OpenAI-compatible HTTP endpoint.
pub struct HttpEmbeddingProvider {
    endpoint: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key: config.resolved_api_key(),
            timeout: Duration::from_millis(config.embed_timeout_ms),
            client: reqwest::Client::new(),
        }
    }

    async fn post_embeddings(&self, body: &EmbeddingsRequest) -> EngineResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.endpoint);

        let mut request = self.client.post(&url).json(body).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout {
                    stage: "embed".to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                EngineError::Provider {
                    message: format!("Embedding request failed: {e}"),
                    status_code: None,
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Provider {
                message: format!("Embedding HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let parsed: EmbeddingsResponse = resp.json().await.map_err(|e| EngineError::Provider {
            message: format!("Failed to parse embedding response: {e}"),
            status_code: None,
        })?;

        if parsed.data.len() != body.input.len() {
            return Err(EngineError::Provider {
                message: format!(
                    "Embedding response has {} vectors for {} inputs",
                    parsed.data.len(),
                    body.input.len()
                ),
                status_code: None,
            });
        }

        // Response order is not guaranteed; the index field is.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            if item.embedding.len() != self.dimension {
                return Err(EngineError::Provider {
                    message: format!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        self.dimension,
                        item.embedding.len()
                    ),
                    status_code: None,
                });
            }
            let mut vector = item.embedding;
            l2_normalize_in_place(&mut vector);
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

/// OpenAI-compatible /embeddings request body.
#[derive(Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
    /// "text" or "image" (image inputs are data URLs).
    #[serde(skip_serializing_if = "Option::is_none")]
    modality: Option<&'static str>,
}

/// OpenAI-compatible /embeddings response.
#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.endpoint);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn embed_text(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingsRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
            modality: None,
        };
        self.post_embeddings(&body).await
    }

    async fn embed_image(&self, image: &ImageInput) -> EngineResult<Vec<f32>> {
        let body = EmbeddingsRequest {
            model: self.model.clone(),
            input: vec![image.data_url()],
            modality: Some("image"),
        };
        let mut vectors = self.post_embeddings(&body).await?;
        vectors.pop().ok_or_else(|| EngineError::Provider {
            message: "Embedding response contained no vector for image input".to_string(),
            status_code: None,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    fn provider() -> HttpEmbeddingProvider {
        HttpEmbeddingProvider::new(&EmbeddingConfig::default())
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let config = EmbeddingConfig {
            endpoint: "http://localhost:7997/".to_string(),
            ..EmbeddingConfig::default()
        };
        let provider = HttpEmbeddingProvider::new(&config);
        assert_eq!(provider.endpoint, "http://localhost:7997");
    }

    #[test]
    fn test_request_body_shape_for_text() {
        let body = EmbeddingsRequest {
            model: "clip-ViT-B-32".to_string(),
            input: vec!["minimalist landing page".to_string()],
            modality: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"input\":[\"minimalist landing page\"]"));
        assert!(!json.contains("modality"));
    }

    #[test]
    fn test_request_body_shape_for_image() {
        let body = EmbeddingsRequest {
            model: "clip-ViT-B-32".to_string(),
            input: vec![ImageInput::from_bytes(&[1, 2, 3], "png").data_url()],
            modality: Some("image"),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"modality\":\"image\""));
        assert!(json.contains("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_empty_text_batch_short_circuits() {
        // No inputs means no HTTP call, so this succeeds without a server.
        let vectors = provider().embed_text(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
