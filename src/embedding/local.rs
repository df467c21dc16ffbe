//! Deterministic local embedding provider.
//!
//! A feature-hashing stand-in for a real local model: lowercased
//! alphanumeric tokens are hashed into a fixed-dimension space (with a
//! second salted hash for term mixing) and the result is unit-normalized.
//! Identical text always embeds to the identical vector, which makes this
//! provider useful both as the no-credential default and as a test double.

use async_trait::async_trait;

use crate::chunker::estimate_tokens;
use crate::embedding::{BatchEmbedding, Embedding, EmbeddingProvider, truncate_text};
use crate::error::Result;
use crate::vector::math::normalize;

const DIMENSION: usize = 384;
const MAX_TEXT_LENGTH: usize = 8192;
const BATCH_GROUP_SIZE: usize = 32;

/// Local hash-projection embedder. No I/O, no credentials, always ready.
#[derive(Debug, Clone, Default)]
pub struct LocalEmbedder;

impl LocalEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let text = truncate_text(text, MAX_TEXT_LENGTH);
        let mut acc = vec![0.0f32; DIMENSION];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let primary = crc32fast::hash(token.as_bytes()) as usize % DIMENSION;
            acc[primary] += 1.0;

            let mut salted = crc32fast::Hasher::new();
            salted.update(token.as_bytes());
            salted.update(&[0x5f]);
            let secondary = salted.finalize() as usize % DIMENSION;
            acc[secondary] += 0.5;
        }
        Embedding {
            vector: normalize(&acc),
            approx_tokens: estimate_tokens(text),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_one(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbedding> {
        let mut batch = BatchEmbedding::default();
        for group in texts.chunks(BATCH_GROUP_SIZE) {
            for text in group {
                let embedding = self.embed_one(text);
                batch.total_approx_tokens += embedding.approx_tokens;
                batch.vectors.push(embedding.vector);
            }
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
        true
    }

    async fn dispose(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::math::{cosine_similarity, magnitude};

    #[test]
    fn embedding_is_deterministic_and_unit_normalized() {
        let embedder = LocalEmbedder::new();
        let a = tokio_test::block_on(embedder.embed("the quick brown fox")).unwrap();
        let b = tokio_test::block_on(embedder.embed("the quick brown fox")).unwrap();
        assert_eq!(a.vector, b.vector);
        assert_eq!(a.vector.len(), DIMENSION);
        assert!((magnitude(&a.vector) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = LocalEmbedder::new();
        let e = tokio_test::block_on(embedder.embed("")).unwrap();
        assert_eq!(magnitude(&e.vector), 0.0);
        assert_eq!(e.approx_tokens, 0);
    }

    #[test]
    fn similar_texts_are_closer_than_unrelated_ones() {
        let embedder = LocalEmbedder::new();
        let rust1 = tokio_test::block_on(embedder.embed("rust borrow checker ownership")).unwrap();
        let rust2 = tokio_test::block_on(embedder.embed("ownership rules in rust")).unwrap();
        let other = tokio_test::block_on(embedder.embed("banana smoothie recipe")).unwrap();
        let close = cosine_similarity(&rust1.vector, &rust2.vector).unwrap();
        let far = cosine_similarity(&rust1.vector, &other.vector).unwrap();
        assert!(close > far);
    }

    #[test]
    fn batch_preserves_order_and_handles_empty_input() {
        let embedder = LocalEmbedder::new();
        let empty = tokio_test::block_on(embedder.embed_batch(&[])).unwrap();
        assert!(empty.vectors.is_empty());
        assert_eq!(empty.total_approx_tokens, 0);

        let texts: Vec<String> = (0..70).map(|i| format!("text number {i}")).collect();
        let batch = tokio_test::block_on(embedder.embed_batch(&texts)).unwrap();
        assert_eq!(batch.vectors.len(), texts.len());
        let direct = tokio_test::block_on(embedder.embed(&texts[69])).unwrap();
        assert_eq!(batch.vectors[69], direct.vector);
        assert!(batch.total_approx_tokens > 0);
    }
}
