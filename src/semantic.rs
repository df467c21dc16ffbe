//! Semantic (embedding similarity) search engine.
//!
//! Index time: chunk each document, embed all chunks in one batch call,
//! replace any previously stored vectors for that path, add the new
//! entries. Query time: embed the query, over-fetch nearest chunks, group
//! them by source document and keep the best chunk score per document.
//!
//! A provider outage degrades `search` to an empty result list instead of
//! failing the caller's request; `embed`/indexing errors for a single
//! document are logged and skipped.

use ahash::AHashMap;
use async_trait::async_trait;

use crate::chunker::DocumentChunker;
use crate::config::SearchConfig;
use crate::data::{Document, MatchContext, SearchRequest, SearchResult};
use crate::embedding::{EmbeddingProvider, create_embedding_provider};
use crate::engine::SearchEngine;
use crate::error::{FathomError, Result};
use crate::util::content_hash;
use crate::vector::store::file::FileVectorStore;
use crate::vector::store::memory::MemoryVectorStore;
use crate::vector::store::{EntryMetadata, VectorEntry, VectorSearchParams, VectorStore};

/// Nearest-entry fetch multiplier over the requested limit, to leave room
/// for several chunks of the same document collapsing into one result.
/// A heuristic tunable, not a sufficiency guarantee: documents with many
/// high-scoring chunks can still crowd out distinct documents.
const OVERFETCH_FACTOR: usize = 2;
/// At most this many snippets are kept per document.
const MAX_MATCHES_PER_DOC: usize = 5;

/// Embedding-backed search engine over a vector store.
pub struct SemanticSearchEngine {
    provider: Box<dyn EmbeddingProvider>,
    store: Box<dyn VectorStore>,
    chunker: DocumentChunker,
    documents: AHashMap<String, Document>,
    /// path -> chunk ids currently stored for that path.
    chunk_ids: AHashMap<String, Vec<String>>,
}

impl SemanticSearchEngine {
    /// Construct from configuration. Fails fast when semantic mode is
    /// disabled or a cloud provider is selected without credentials. For a
    /// file-backed store the snapshot is loaded here.
    pub async fn open(config: &SearchConfig) -> Result<Self> {
        if !config.semantic.enabled {
            return Err(FathomError::invalid_argument(
                "semantic search is not enabled in configuration",
            ));
        }
        let provider = create_embedding_provider(&config.semantic.provider)?;
        let store: Box<dyn VectorStore> = match &config.semantic.index_path {
            Some(path) => {
                let mut store = FileVectorStore::new(path.clone());
                store.load().await?;
                Box::new(store)
            }
            None => Box::new(MemoryVectorStore::new()),
        };

        let mut engine = Self {
            provider,
            store,
            chunker: DocumentChunker::new(config.chunker.clone()),
            documents: AHashMap::new(),
            chunk_ids: AHashMap::new(),
        };
        engine.rebuild_tracking();
        Ok(engine)
    }

    /// Rebuild the path -> chunk-id map and the document map from store
    /// contents (after a snapshot load). Reconstructed documents carry no
    /// text; the stored timestamp drives the unchanged-document skip and
    /// the rest lets reloaded entries surface in search results.
    fn rebuild_tracking(&mut self) {
        for entry in self.store.all_entries() {
            let meta = &entry.metadata;
            self.chunk_ids
                .entry(meta.document_path.clone())
                .or_default()
                .push(meta.id.clone());
            self.documents
                .entry(meta.document_path.clone())
                .or_insert_with(|| Document {
                    path: meta.document_path.clone(),
                    title: meta.title.clone(),
                    size: 0,
                    last_modified: meta.last_modified,
                    text_content: None,
                });
        }
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of stored chunk vectors.
    pub fn vector_count(&self) -> usize {
        self.store.len()
    }

    /// Index documents, skipping ones unchanged since the last index call.
    /// A failure on one document is logged and does not abort the rest.
    pub async fn index(&mut self, documents: Vec<Document>) -> Result<()> {
        for document in documents {
            if document.text_content.is_none() {
                continue;
            }
            if let Some(existing) = self.documents.get(&document.path) {
                if existing.last_modified == document.last_modified {
                    log::debug!("'{}' unchanged, skipping re-index", document.path);
                    continue;
                }
            }
            if let Err(err) = self.index_document(&document).await {
                log::warn!("failed to index '{}': {err}", document.path);
            }
        }
        Ok(())
    }

    /// Re-index one document unconditionally.
    pub async fn update(&mut self, document: Document) -> Result<()> {
        if document.text_content.is_none() {
            return Ok(());
        }
        self.index_document(&document).await
    }

    /// Drop one document's vectors and bookkeeping. No-op when absent.
    pub async fn remove(&mut self, path: &str) -> Result<()> {
        self.remove_stored_chunks(path).await?;
        self.documents.remove(path);
        Ok(())
    }

    /// Search by embedding similarity. Empty queries and internal failures
    /// (provider outage, store errors) yield an empty result list.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        match self.search_inner(query, request.limit).await {
            Ok(results) => Ok(results),
            Err(err) => {
                log::warn!("semantic search degraded to empty results: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// Persist the store (no-op when in-memory), then release the provider.
    pub async fn dispose(&mut self) -> Result<()> {
        self.store.persist().await?;
        self.provider.dispose().await
    }

    async fn index_document(&mut self, document: &Document) -> Result<()> {
        let chunks = self.chunker.chunk(document);

        if chunks.is_empty() {
            self.remove_stored_chunks(&document.path).await?;
        } else {
            // Embed before touching the store: an embedding failure must
            // leave the previously indexed vectors intact.
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let batch = self.provider.embed_batch(&texts).await?;
            if batch.vectors.len() != chunks.len() {
                return Err(FathomError::internal(format!(
                    "provider '{}' returned {} vectors for {} chunks",
                    self.provider.name(),
                    batch.vectors.len(),
                    chunks.len()
                )));
            }
            self.remove_stored_chunks(&document.path).await?;

            let mut ids = Vec::with_capacity(chunks.len());
            let mut entries = Vec::with_capacity(chunks.len());
            for (chunk, vector) in chunks.iter().zip(batch.vectors) {
                ids.push(chunk.id.clone());
                entries.push(VectorEntry {
                    vector,
                    metadata: EntryMetadata {
                        id: chunk.id.clone(),
                        document_path: document.path.clone(),
                        title: document.title.clone(),
                        last_modified: document.last_modified,
                        content_hash: content_hash(&chunk.content),
                        chunk_index: chunk.chunk_index,
                        start_line: chunk.start_line,
                        end_line: chunk.end_line,
                        raw_content: chunk.content.clone(),
                        extra: Default::default(),
                    },
                });
            }
            self.store.add_batch(entries).await?;
            self.chunk_ids.insert(document.path.clone(), ids);
        }

        self.documents
            .insert(document.path.clone(), document.clone());
        Ok(())
    }

    async fn remove_stored_chunks(&mut self, path: &str) -> Result<()> {
        if let Some(old_ids) = self.chunk_ids.remove(path) {
            for id in old_ids {
                if self.store.has(&id) {
                    self.store.remove(&id).await?;
                }
            }
        }
        Ok(())
    }

    async fn search_inner(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let embedding = self.provider.embed(query).await?;
        let params = VectorSearchParams::top_k(limit.max(1) * OVERFETCH_FACTOR);
        let hits = self.store.search(&embedding.vector, &params)?;

        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        // Group chunk hits by document, keeping the best chunk score.
        struct Group {
            score: f32,
            matches: Vec<MatchContext>,
        }
        let mut order: Vec<String> = Vec::new();
        let mut groups: AHashMap<String, Group> = AHashMap::new();
        for hit in &hits {
            let meta = &hit.entry.metadata;
            let snippet = snippet_context(meta, &terms);
            match groups.get_mut(&meta.document_path) {
                Some(group) => {
                    group.score = group.score.max(hit.score);
                    if group.matches.len() < MAX_MATCHES_PER_DOC {
                        group.matches.push(snippet);
                    }
                }
                None => {
                    order.push(meta.document_path.clone());
                    groups.insert(
                        meta.document_path.clone(),
                        Group {
                            score: hit.score,
                            matches: vec![snippet],
                        },
                    );
                }
            }
        }

        let mut results = Vec::with_capacity(order.len());
        for path in order {
            let Some(group) = groups.remove(&path) else {
                continue;
            };
            let Some(document) = self.documents.get(&path) else {
                log::warn!("vector hit for unindexed document '{path}', skipping");
                continue;
            };
            results.push(SearchResult {
                document: document.clone(),
                score: group.score,
                matches: group.matches,
            });
        }
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }
}

/// Pick the sentence of the chunk containing the most query-term
/// occurrences as the display snippet; fall back to the first sentence.
fn snippet_context(meta: &EntryMetadata, terms: &[String]) -> MatchContext {
    let sentence = best_sentence(&meta.raw_content, terms);
    let lower = sentence.to_lowercase();
    let (match_start, match_end) = terms
        .iter()
        .find_map(|term| lower.find(term.as_str()).map(|at| (at, at + term.len())))
        .unwrap_or((0, 0));
    MatchContext {
        line_number: meta.start_line,
        snippet_text: sentence,
        match_start,
        match_end,
    }
}

fn best_sentence(content: &str, terms: &[String]) -> String {
    let mut best: Option<&str> = None;
    let mut best_count = 0usize;
    let mut first: Option<&str> = None;
    for sentence in content.split(['.', '!', '?']) {
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            continue;
        }
        if first.is_none() {
            first = Some(trimmed);
        }
        let lower = trimmed.to_lowercase();
        let count: usize = terms.iter().map(|t| lower.matches(t.as_str()).count()).sum();
        if count > best_count {
            best_count = count;
            best = Some(trimmed);
        }
    }
    best.or(first).unwrap_or("").to_string()
}

#[async_trait]
impl SearchEngine for SemanticSearchEngine {
    async fn index(&mut self, documents: Vec<Document>) -> Result<()> {
        SemanticSearchEngine::index(self, documents).await
    }

    async fn update(&mut self, document: Document) -> Result<()> {
        SemanticSearchEngine::update(self, document).await
    }

    async fn remove(&mut self, path: &str) -> Result<()> {
        SemanticSearchEngine::remove(self, path).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        SemanticSearchEngine::search(self, request).await
    }

    async fn dispose(&mut self) -> Result<()> {
        SemanticSearchEngine::dispose(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_sentence_prefers_term_dense_sentences() {
        let content = "Intro without terms. Rust rust everywhere in rust! Something else?";
        let terms = vec!["rust".to_string()];
        assert_eq!(best_sentence(content, &terms), "Rust rust everywhere in rust");
    }

    #[test]
    fn best_sentence_falls_back_to_first() {
        let content = "The opening sentence. Another one follows.";
        let terms = vec!["absent".to_string()];
        assert_eq!(best_sentence(content, &terms), "The opening sentence");
    }

    #[test]
    fn snippet_locates_first_term() {
        let meta = EntryMetadata {
            raw_content: "Plain prefix. Needle sits here.".to_string(),
            start_line: 7,
            ..Default::default()
        };
        let ctx = snippet_context(&meta, &["needle".to_string()]);
        assert_eq!(ctx.line_number, 7);
        assert_eq!(ctx.snippet_text, "Needle sits here");
        assert_eq!(ctx.match_start, 0);
        assert_eq!(ctx.match_end, "needle".len());
    }
}
