//! Vector storage: `(vector, metadata)` entries with similarity search.
//!
//! [`VectorStore`] is the capability contract; [`memory::MemoryVectorStore`]
//! is the canonical implementation and [`file::FileVectorStore`] wraps it
//! with atomic JSON snapshot persistence.

pub mod file;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata attached to a stored vector. `id` is mandatory and unique
/// across the store; it must equal the source chunk's id so results can be
/// re-associated with documents and stale chunks removed before re-indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub id: String,
    pub document_path: String,
    pub title: String,
    pub last_modified: DateTime<Utc>,
    pub content_hash: String,
    pub chunk_index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub raw_content: String,
    /// Extensible caller-defined fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            id: String::new(),
            document_path: String::new(),
            title: String::new(),
            last_modified: Utc::now(),
            content_hash: String::new(),
            chunk_index: 0,
            start_line: 0,
            end_line: 0,
            raw_content: String::new(),
            extra: HashMap::new(),
        }
    }
}

/// A stored `(vector, metadata)` pair. The vector is expected to be
/// unit-normalized by the embedding provider; the store does not enforce
/// dimensionality across entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// Caller-supplied metadata predicate for search filtering.
pub type MetadataPredicate = Box<dyn Fn(&EntryMetadata) -> bool + Send + Sync>;

/// Parameters for [`VectorStore::search`].
pub struct VectorSearchParams {
    /// Maximum number of hits to return.
    pub top_k: usize,
    /// Drop hits scoring below this threshold.
    pub min_score: Option<f32>,
    /// Drop hits whose metadata fails this predicate.
    pub filter: Option<MetadataPredicate>,
}

impl VectorSearchParams {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            min_score: None,
            filter: None,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_filter(
        mut self,
        filter: impl Fn(&EntryMetadata) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl Default for VectorSearchParams {
    fn default() -> Self {
        Self::top_k(10)
    }
}

/// A search hit: cloned entry plus cosine-similarity score.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: VectorEntry,
    pub score: f32,
}

/// Storage for vector entries with cosine-similarity search.
///
/// Callers are expected to serialize mutations on one instance; the trait
/// provides no internal mutual exclusion.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add an entry. Fails with `InvalidArgument` when `metadata.id` is
    /// empty; an existing entry with the same id is replaced in place.
    async fn add(&mut self, entry: VectorEntry) -> Result<()>;

    /// Add many entries.
    async fn add_batch(&mut self, entries: Vec<VectorEntry>) -> Result<()>;

    /// Replace the entry stored under `id`. Fails with `NotFound` when the
    /// id is absent.
    async fn update(&mut self, id: &str, entry: VectorEntry) -> Result<()>;

    /// Remove one entry. Fails with `NotFound` when the id is absent.
    async fn remove(&mut self, id: &str) -> Result<()>;

    /// Remove many entries. Not transactional: entries preceding a missing
    /// id stay removed when the call fails with `NotFound`.
    async fn remove_batch(&mut self, ids: &[String]) -> Result<()>;

    /// Look up an entry; absent ids yield `None`, not an error.
    fn get(&self, id: &str) -> Option<&VectorEntry>;

    fn has(&self, id: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn clear(&mut self) -> Result<()>;

    fn all_entries(&self) -> Vec<&VectorEntry>;

    fn all_ids(&self) -> Vec<String>;

    /// Score every stored entry by cosine similarity against `query`,
    /// apply the optional filter and `min_score`, and return at most
    /// `top_k` hits sorted descending by score. Equal scores tie-break by
    /// insertion order (stable sort over the store's insertion list).
    fn search(&self, query: &[f32], params: &VectorSearchParams) -> Result<Vec<ScoredEntry>>;

    /// Flush state to durable storage. No-op for purely in-memory stores.
    async fn persist(&self) -> Result<()> {
        Ok(())
    }
}
