//! Embedding Client — wraps an `EmbeddingProvider` with the degrade policy:
//! any provider failure yields a zero vector of the configured size.
//! Callers treat an all-zero vector as "no signal".

use std::sync::Arc;

use tracing::warn;

use crate::llm_client::EmbeddingProvider;

/// Inputs longer than this are cut on a char boundary before the call.
const MAX_INPUT_CHARS: usize = 24_000;

#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    dimensions: usize,
}

impl EmbeddingClient {
    /// `provider = None` means the embedding provider is unconfigured.
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, dimensions: usize) -> Self {
        Self {
            provider,
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimensions]
    }

    /// Embeds `text`, or returns the zero vector when the text is blank, the
    /// provider is unconfigured or fails, or the result has the wrong length.
    pub async fn embed_or_zero(&self, text: &str) -> Vec<f32> {
        let Some(provider) = &self.provider else {
            warn!("Embedding provider not configured; using zero vector");
            return self.zero_vector();
        };

        let text = text.trim();
        if text.is_empty() {
            warn!("Refusing to embed empty text; using zero vector");
            return self.zero_vector();
        }

        match provider.embed(truncate_chars(text, MAX_INPUT_CHARS)).await {
            Ok(vector) if vector.len() == self.dimensions => vector,
            Ok(vector) => {
                warn!(
                    "Embedding provider returned {} dimensions, expected {}; using zero vector",
                    vector.len(),
                    self.dimensions
                );
                self.zero_vector()
            }
            Err(e) => {
                warn!("Embedding generation failed: {e}; using zero vector");
                self.zero_vector()
            }
        }
    }
}

pub fn is_zero_vector(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeEmbeddings;

    #[tokio::test]
    async fn test_embed_returns_provider_vector() {
        let provider = Arc::new(FakeEmbeddings::constant(vec![0.5, 0.5, 0.0]));
        let client = EmbeddingClient::new(Some(provider.clone()), 3);
        assert_eq!(client.embed_or_zero("rust engineer").await, vec![0.5, 0.5, 0.0]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_yields_zero_vector() {
        let client = EmbeddingClient::new(Some(Arc::new(FakeEmbeddings::failing())), 4);
        let vector = client.embed_or_zero("rust engineer").await;
        assert_eq!(vector.len(), 4);
        assert!(is_zero_vector(&vector));
    }

    #[tokio::test]
    async fn test_wrong_dimensions_yield_zero_vector() {
        let provider = Arc::new(FakeEmbeddings::constant(vec![1.0, 2.0]));
        let client = EmbeddingClient::new(Some(provider), 3);
        assert_eq!(client.embed_or_zero("text").await, vec![0.0; 3]);
    }

    #[tokio::test]
    async fn test_blank_text_skips_provider() {
        let provider = Arc::new(FakeEmbeddings::constant(vec![1.0]));
        let client = EmbeddingClient::new(Some(provider.clone()), 1);
        assert_eq!(client.embed_or_zero("   ").await, vec![0.0]);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_client_yields_zero_vector() {
        let client = EmbeddingClient::new(None, 2);
        assert!(!client.is_configured());
        assert_eq!(client.embed_or_zero("text").await, vec![0.0, 0.0]);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
