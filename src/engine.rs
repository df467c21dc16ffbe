//! The engine capability contract and its factory.
//!
//! External collaborators consume two interfaces: document ingestion
//! (`index`/`update`/`remove`) and querying (`search`). Engine selection is
//! keyed by [`SearchMode`] and dispatched exhaustively here.

use async_trait::async_trait;

use crate::config::{SearchConfig, SearchMode};
use crate::data::{Document, SearchRequest, SearchResult};
use crate::error::Result;
use crate::hybrid::HybridSearchEngine;
use crate::lexical::LexicalSearchEngine;
use crate::semantic::SemanticSearchEngine;

/// Capability contract shared by the keyword, semantic and hybrid engines.
///
/// Callers are expected to serialize calls on one instance; engines provide
/// no internal mutual exclusion.
#[async_trait]
pub trait SearchEngine: Send {
    /// Ingest a document set. Engines with a full-rebuild index replace
    /// their document map; the semantic engine skips unchanged documents.
    async fn index(&mut self, documents: Vec<Document>) -> Result<()>;

    /// Upsert one document.
    async fn update(&mut self, document: Document) -> Result<()>;

    /// Remove one document by path. No-op when the path is not indexed.
    async fn remove(&mut self, path: &str) -> Result<()>;

    /// Execute a query. An empty query yields an empty result list.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>>;

    /// Release engine resources (persist file-backed state, drop provider
    /// handles). Idempotent.
    async fn dispose(&mut self) -> Result<()>;
}

/// Build the engine selected by `config.mode`.
///
/// Fails fast on structurally invalid configuration: semantic or hybrid
/// mode with semantic search disabled, or a cloud provider without
/// credentials.
pub async fn create_search_engine(config: &SearchConfig) -> Result<Box<dyn SearchEngine>> {
    match config.mode {
        SearchMode::Keyword => Ok(Box::new(LexicalSearchEngine::new())),
        SearchMode::Semantic => Ok(Box::new(SemanticSearchEngine::open(config).await?)),
        SearchMode::Hybrid => Ok(Box::new(HybridSearchEngine::open(config).await?)),
    }
}
