//! Embedding provider trait and input types.
//!
//! Text and image embeddings must come from the same joint-space model, or
//! cosine scores between queries and images are meaningless. The provider
//! owns that guarantee; everything downstream just sees vectors.

pub mod http;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use crate::error::EngineResult;

/// Base64-encoded image ready to send to an embedding API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png", "webp").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Trait that all embedding providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn EmbeddingProvider>` for dynamic dispatch).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logging (e.g., "http").
    fn name(&self) -> &str;

    /// Dimension of the vectors this provider returns.
    fn dimension(&self) -> usize;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Embed a batch of text queries, one vector per input, in input order.
    /// Returned vectors are L2-normalized.
    async fn embed_text(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>>;

    /// Embed one image. The returned vector is L2-normalized.
    async fn embed_image(&self, image: &ImageInput) -> EngineResult<Vec<f32>>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_input_from_bytes_jpeg() {
        let input = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], "jpeg");
        assert_eq!(input.media_type, "image/jpeg");
        assert!(!input.data.is_empty());
    }

    #[test]
    fn test_image_input_from_bytes_png() {
        let input = ImageInput::from_bytes(&[0x89, 0x50, 0x4E, 0x47], "png");
        assert_eq!(input.media_type, "image/png");
    }

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "jpeg");
        let url = input.data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
