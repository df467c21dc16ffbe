//! Embedding providers.
//!
//! [`EmbeddingProvider`] is the contract every provider satisfies:
//! fixed-dimension unit-normalized vectors, batch embedding in
//! provider-defined groups with input order preserved, truncation of
//! over-long text at a whitespace boundary, and a health probe that never
//! fails. Concrete network providers are feature-gated; the deterministic
//! [`local::LocalEmbedder`] is always available.

pub mod local;

#[cfg(feature = "embeddings-cohere")]
pub mod cohere;
#[cfg(feature = "embeddings-openai")]
pub mod openai;

use async_trait::async_trait;

use crate::config::EmbeddingProviderConfig;
use crate::error::Result;
use crate::util::floor_char_boundary;

/// A single embedded text.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// Unit-normalized vector (a zero vector stays zero).
    pub vector: Vec<f32>,
    /// Estimated token count of the (possibly truncated) input.
    pub approx_tokens: usize,
}

/// A batch of embedded texts, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchEmbedding {
    pub vectors: Vec<Vec<f32>>,
    pub total_approx_tokens: usize,
}

/// Contract for converting text into fixed-dimension unit vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. Input longer than [`max_text_length`] is truncated
    /// first. Provider failures are returned as
    /// [`FathomError::Provider`](crate::FathomError::Provider) with the
    /// original cause preserved in the message.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed many texts, processed in provider-defined batch-size groups.
    /// Output order matches input order; empty input yields an empty batch
    /// with zero tokens.
    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbedding>;

    /// Dimensionality of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Maximum accepted input length in bytes; longer text is truncated.
    fn max_text_length(&self) -> usize;

    /// Probe provider health. Swallows all errors and returns `false`
    /// instead of failing.
    async fn is_ready(&self) -> bool;

    /// Release provider resources. Idempotent.
    async fn dispose(&self) -> Result<()>;

    /// Provider name for logs and error prefixes.
    fn name(&self) -> &str;
}

/// Truncate text to at most `max_len` bytes, cutting at the last whitespace
/// at or before the limit. Falls back to a hard (char-boundary-safe) cut
/// when the prefix contains no whitespace.
pub fn truncate_text(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let hard = floor_char_boundary(text, max_len);
    match text[..hard].rfind(char::is_whitespace) {
        Some(ws) if ws > 0 => &text[..ws],
        _ => &text[..hard],
    }
}

/// Construct a provider from configuration. Cloud providers fail fast when
/// credentials are missing or the matching cargo feature is not compiled in.
pub fn create_embedding_provider(
    config: &EmbeddingProviderConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config {
        EmbeddingProviderConfig::Local => Ok(Box::new(local::LocalEmbedder::new())),
        EmbeddingProviderConfig::OpenAi { api_key, model } => {
            if api_key.trim().is_empty() {
                return Err(crate::FathomError::invalid_argument(
                    "openai embedding provider requires an API key",
                ));
            }
            #[cfg(feature = "embeddings-openai")]
            {
                Ok(Box::new(openai::OpenAiEmbedder::new(
                    api_key.clone(),
                    model.clone(),
                )))
            }
            #[cfg(not(feature = "embeddings-openai"))]
            {
                let _ = model;
                Err(crate::FathomError::invalid_argument(
                    "openai provider selected but the 'embeddings-openai' feature is not enabled",
                ))
            }
        }
        EmbeddingProviderConfig::Cohere { api_key, model } => {
            if api_key.trim().is_empty() {
                return Err(crate::FathomError::invalid_argument(
                    "cohere embedding provider requires an API key",
                ));
            }
            #[cfg(feature = "embeddings-cohere")]
            {
                Ok(Box::new(cohere::CohereEmbedder::new(
                    api_key.clone(),
                    model.clone(),
                )))
            }
            #[cfg(not(feature = "embeddings-cohere"))]
            {
                let _ = model;
                Err(crate::FathomError::invalid_argument(
                    "cohere provider selected but the 'embeddings-cohere' feature is not enabled",
                ))
            }
        }
    }
}
