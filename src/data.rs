//! Core data types shared by all search engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    10
}

/// A document in the searchable corpus.
///
/// Documents are supplied wholesale by whatever component scans the corpus;
/// a change to a file is communicated by re-supplying the whole document,
/// never by patching fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (typically the file path).
    pub path: String,
    /// Display title.
    pub title: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Full text content. `None` means the content has not been loaded yet;
    /// such documents are skipped at index time.
    #[serde(default)]
    pub text_content: Option<String>,
}

impl Document {
    /// Create a document with content, stamped with the current time.
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            title: title.into(),
            size: content.len() as u64,
            last_modified: Utc::now(),
            text_content: Some(content),
        }
    }

    /// Set the last-modified timestamp.
    pub fn with_last_modified(mut self, ts: DateTime<Utc>) -> Self {
        self.last_modified = ts;
        self
    }
}

/// A single matched location inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    /// 1-based line number of the match (for semantic results, the first
    /// line of the chunk the snippet came from).
    pub line_number: usize,
    /// Surrounding text, clipped to the line and to char boundaries.
    pub snippet_text: String,
    /// Byte offset of the match within the original line.
    pub match_start: usize,
    /// Byte offset one past the end of the match within the original line.
    pub match_end: usize,
}

/// One ranked search hit.
///
/// Transient: constructed fresh per query, never persisted. The document is
/// a clone of the engine's own copy, so callers can hold results without
/// borrowing engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Relevance score, expected in `[0, 1]`.
    pub score: f32,
    /// Matched locations, at most 5 per document.
    pub matches: Vec<MatchContext>,
}

/// A search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text.
    pub query: String,
    /// Maximum number of results to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl SearchRequest {
    /// Create a request with the default limit.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: default_limit(),
        }
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}
