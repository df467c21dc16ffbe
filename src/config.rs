//! Search configuration types.
//!
//! These are plain serde-deserializable structures; loading and merging
//! config files is the caller's concern.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chunker::ChunkerConfig;
use crate::error::{FathomError, Result};

fn default_keyword_weight() -> f32 {
    0.4
}

fn default_semantic_weight() -> f32 {
    0.6
}

/// Which engine answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Lexical substring matching only.
    Keyword,
    /// Embedding similarity only.
    Semantic,
    /// Weighted fusion of both.
    #[default]
    Hybrid,
}

impl FromStr for SearchMode {
    type Err = FathomError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keyword" => Ok(SearchMode::Keyword),
            "semantic" => Ok(SearchMode::Semantic),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(FathomError::invalid_argument(format!(
                "unknown search mode '{other}' (expected keyword, semantic or hybrid)"
            ))),
        }
    }
}

/// Embedding provider selection, with the credential shape each provider
/// requires. Matched exhaustively at the factory boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbeddingProviderConfig {
    /// Built-in deterministic local model; no credentials.
    #[default]
    Local,
    /// OpenAI embeddings API (requires the `embeddings-openai` feature).
    OpenAi {
        api_key: String,
        #[serde(default)]
        model: Option<String>,
    },
    /// Cohere embeddings API (requires the `embeddings-cohere` feature).
    Cohere {
        api_key: String,
        #[serde(default)]
        model: Option<String>,
    },
}

/// Semantic engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Semantic search must be explicitly enabled; the semantic and hybrid
    /// engines refuse to construct otherwise.
    #[serde(default)]
    pub enabled: bool,
    /// Embedding provider to use.
    #[serde(default)]
    pub provider: EmbeddingProviderConfig,
    /// Snapshot path for a file-backed vector store. `None` keeps the
    /// index in memory only.
    #[serde(default)]
    pub index_path: Option<PathBuf>,
}

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Engine selection.
    #[serde(default)]
    pub mode: SearchMode,
    /// Semantic engine settings.
    #[serde(default)]
    pub semantic: SemanticConfig,
    /// Weight of the lexical score in hybrid fusion.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
    /// Weight of the semantic score in hybrid fusion.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,
    /// Chunking options for the semantic engine.
    #[serde(default)]
    pub chunker: ChunkerConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            semantic: SemanticConfig::default(),
            keyword_weight: default_keyword_weight(),
            semantic_weight: default_semantic_weight(),
            chunker: ChunkerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_and_rejects() {
        assert_eq!("hybrid".parse::<SearchMode>().unwrap(), SearchMode::Hybrid);
        assert_eq!(
            "keyword".parse::<SearchMode>().unwrap(),
            SearchMode::Keyword
        );
        assert!("fulltext".parse::<SearchMode>().is_err());
    }

    #[test]
    fn provider_config_deserializes_from_tagged_json() {
        let cfg: EmbeddingProviderConfig =
            serde_json::from_str(r#"{"provider":"openai","api_key":"sk-test"}"#).unwrap();
        assert!(matches!(cfg, EmbeddingProviderConfig::OpenAi { .. }));

        let cfg: EmbeddingProviderConfig =
            serde_json::from_str(r#"{"provider":"local"}"#).unwrap();
        assert!(matches!(cfg, EmbeddingProviderConfig::Local));
    }

    #[test]
    fn search_config_defaults() {
        let cfg: SearchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.mode, SearchMode::Hybrid);
        assert!(!cfg.semantic.enabled);
        assert_eq!(cfg.keyword_weight, 0.4);
        assert_eq!(cfg.semantic_weight, 0.6);
    }
}
