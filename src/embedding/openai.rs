//! OpenAI embeddings API provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::chunker::estimate_tokens;
use crate::embedding::{BatchEmbedding, Embedding, EmbeddingProvider, truncate_text};
use crate::error::{FathomError, Result};
use crate::vector::math::normalize;

const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DIMENSION: usize = 1536;
const MAX_TEXT_LENGTH: usize = 32_000;
const BATCH_GROUP_SIZE: usize = 100;
const BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding provider backed by the OpenAI `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
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
            "input": texts,
        });
        let response = self
            .client
            .post(format!("{BASE_URL}/embeddings"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| FathomError::provider(format!("openai: {err}")))?
            .error_for_status()
            .map_err(|err| FathomError::provider(format!("openai: {err}")))?;
        let mut payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| FathomError::provider(format!("openai: {err}")))?;
        if payload.data.len() != texts.len() {
            return Err(FathomError::provider(format!(
                "openai: expected {} embeddings, got {}",
                texts.len(),
                payload.data.len()
            )));
        }
        // Output order is not guaranteed; sort by the returned index.
        payload.data.sort_by_key(|obj| obj.index);
        Ok(payload
            .data
            .into_iter()
            .map(|obj| normalize(&obj.embedding))
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let text = truncate_text(text, MAX_TEXT_LENGTH);
        let mut vectors = self.request_group(&[text]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| FathomError::provider("openai: empty embedding response"))?;
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
        self.client
            .get(format!("{BASE_URL}/models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn dispose(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
