//! # Fathom
//!
//! A local hybrid document search core combining lexical and
//! vector-similarity retrieval.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Paragraph- and code-block-aware document chunking
//! - Pluggable embedding providers (deterministic local by default;
//!   OpenAI and Cohere behind cargo features)
//! - In-memory and snapshot-persisted vector stores
//! - Weighted fusion of keyword and semantic scores

// Core modules
pub mod chunker;
pub mod config;
mod data;
pub mod embedding;
mod engine;
mod error;
pub mod hybrid;
pub mod lexical;
pub mod semantic;
mod util;
pub mod vector;

// Re-exports for the public API
pub use chunker::{ChunkerConfig, DocumentChunk, DocumentChunker};
pub use config::{EmbeddingProviderConfig, SearchConfig, SearchMode, SemanticConfig};
pub use data::{Document, MatchContext, SearchRequest, SearchResult};
#[cfg(feature = "embeddings-cohere")]
pub use embedding::cohere::CohereEmbedder;
pub use embedding::local::LocalEmbedder;
#[cfg(feature = "embeddings-openai")]
pub use embedding::openai::OpenAiEmbedder;
pub use embedding::{BatchEmbedding, Embedding, EmbeddingProvider, create_embedding_provider};
pub use engine::{SearchEngine, create_search_engine};
pub use error::{FathomError, Result};
pub use hybrid::HybridSearchEngine;
pub use lexical::LexicalSearchEngine;
pub use semantic::SemanticSearchEngine;
pub use vector::store::file::FileVectorStore;
pub use vector::store::memory::MemoryVectorStore;
pub use vector::store::{
    EntryMetadata, MetadataPredicate, ScoredEntry, VectorEntry, VectorSearchParams, VectorStore,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
