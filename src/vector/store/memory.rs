//! In-memory vector store.

use ahash::AHashMap;
use async_trait::async_trait;

use crate::error::{FathomError, Result};
use crate::vector::math::cosine_similarity;
use crate::vector::store::{ScoredEntry, VectorEntry, VectorSearchParams, VectorStore};

/// In-memory `(vector, metadata)` store. Keeps an explicit insertion-order
/// list so equal-score search hits tie-break deterministically.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    entries: AHashMap<String, VectorEntry>,
    order: Vec<String>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, entry: VectorEntry) -> Result<()> {
        let id = entry.metadata.id.clone();
        if id.is_empty() {
            return Err(FathomError::invalid_argument(
                "vector entry metadata.id is required",
            ));
        }
        if self.entries.insert(id.clone(), entry).is_none() {
            self.order.push(id);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&mut self, entry: VectorEntry) -> Result<()> {
        self.insert(entry)
    }

    async fn add_batch(&mut self, entries: Vec<VectorEntry>) -> Result<()> {
        for entry in entries {
            self.insert(entry)?;
        }
        Ok(())
    }

    async fn update(&mut self, id: &str, entry: VectorEntry) -> Result<()> {
        if !self.entries.contains_key(id) {
            return Err(FathomError::not_found(format!(
                "vector entry '{id}' not found"
            )));
        }
        // The slot keeps its position in the insertion order.
        self.entries.insert(id.to_string(), entry);
        Ok(())
    }

    async fn remove(&mut self, id: &str) -> Result<()> {
        if self.entries.remove(id).is_none() {
            return Err(FathomError::not_found(format!(
                "vector entry '{id}' not found"
            )));
        }
        self.order.retain(|existing| existing != id);
        Ok(())
    }

    async fn remove_batch(&mut self, ids: &[String]) -> Result<()> {
        // Loop-and-fail: removals before a missing id are not rolled back.
        for id in ids {
            self.remove(id).await?;
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Option<&VectorEntry> {
        self.entries.get(id)
    }

    fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.order.clear();
        Ok(())
    }

    fn all_entries(&self) -> Vec<&VectorEntry> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .collect()
    }

    fn all_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    fn search(&self, query: &[f32], params: &VectorSearchParams) -> Result<Vec<ScoredEntry>> {
        let mut hits = Vec::new();
        for id in &self.order {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            if let Some(filter) = &params.filter {
                if !filter(&entry.metadata) {
                    continue;
                }
            }
            let score = cosine_similarity(query, &entry.vector)?;
            if let Some(min) = params.min_score {
                if score < min {
                    continue;
                }
            }
            hits.push(ScoredEntry {
                entry: entry.clone(),
                score,
            });
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(params.top_k);
        Ok(hits)
    }
}
