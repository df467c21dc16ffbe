//! Cohere embeddings API provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::chunker::estimate_tokens;
use crate::embedding::{BatchEmbedding, Embedding, EmbeddingProvider, truncate_text};
use crate::error::{FathomError, Result};
use crate::vector::math::normalize;

const DEFAULT_MODEL: &str = "embed-english-v3.0";
const DIMENSION: usize = 1024;
const MAX_TEXT_LENGTH: usize = 8192;
const BATCH_GROUP_SIZE: usize = 96;
const BASE_URL: &str = "https://api.cohere.com/v1";

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider backed by the Cohere `/embed` endpoint.
pub struct CohereEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl CohereEmbedder {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn request_group(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = json!({
            "model": self.model,
            "texts": texts,
            "input_type": "search_document",
        });
        let response = self
            .client
            .post(format!("{BASE_URL}/embed"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| FathomError::provider(format!("cohere: {err}")))?
            .error_for_status()
            .map_err(|err| FathomError::provider(format!("cohere: {err}")))?;
        let payload: EmbedResponse = response
            .json()
            .await
            .map_err(|err| FathomError::provider(format!("cohere: {err}")))?;
        if payload.embeddings.len() != texts.len() {
            return Err(FathomError::provider(format!(
                "cohere: expected {} embeddings, got {}",
                texts.len(),
                payload.embeddings.len()
            )));
        }
        Ok(payload
            .embeddings
            .iter()
            .map(|v| normalize(v))
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for CohereEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let text = truncate_text(text, MAX_TEXT_LENGTH);
        let mut vectors = self.request_group(&[text]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| FathomError::provider("cohere: empty embedding response"))?;
        Ok(Embedding {
            vector,
            approx_tokens: estimate_tokens(text),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbedding> {
        let mut batch = BatchEmbedding::default();
        for group in texts.chunks(BATCH_GROUP_SIZE) {
            let truncated: Vec<&str> = group
                .iter()
                .map(|t| truncate_text(t, MAX_TEXT_LENGTH))
                .collect();
            let vectors = self.request_group(&truncated).await?;
            batch.total_approx_tokens += truncated
                .iter()
                .map(|t| estimate_tokens(t))
                .sum::<usize>();
            batch.vectors.extend(vectors);
        }
        Ok(batch)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn max_text_length(&self) -> usize {
        MAX_TEXT_LENGTH
    }

    async fn is_ready(&self) -> bool {
        // A one-token embed doubles as the health probe; all errors are
        // swallowed into `false`.
        self.request_group(&["ping"]).await.is_ok()
    }

    async fn dispose(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "cohere"
    }
}
