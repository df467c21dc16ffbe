//! Lexical (keyword) search engine.
//!
//! Case-insensitive substring matching over raw document text, with
//! line-level match contexts and a frequency/density relevance score.

use ahash::AHashMap;
use async_trait::async_trait;

use crate::data::{Document, MatchContext, SearchRequest, SearchResult};
use crate::engine::SearchEngine;
use crate::error::Result;
use crate::util::{ceil_char_boundary, floor_char_boundary};

/// At most this many match contexts are extracted per document.
const MAX_MATCHES_PER_DOC: usize = 5;
/// Bytes of surrounding text kept on each side of a match, clipped to the
/// line.
const CONTEXT_RADIUS: usize = 50;

/// Substring-based keyword search over an owned document map.
#[derive(Debug, Default)]
pub struct LexicalSearchEngine {
    documents: AHashMap<String, Document>,
}

impl LexicalSearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Replace the entire document set. Full rebuild, not incremental.
    pub fn index(&mut self, documents: Vec<Document>) {
        self.documents.clear();
        for document in documents {
            self.documents.insert(document.path.clone(), document);
        }
    }

    /// Upsert one document without re-scoring others.
    pub fn update(&mut self, document: Document) {
        self.documents.insert(document.path.clone(), document);
    }

    /// Remove one document. No-op when the path is not indexed.
    pub fn remove(&mut self, path: &str) {
        self.documents.remove(path);
    }

    /// Search the indexed documents. An empty query yields no results.
    pub fn search(&self, request: &SearchRequest) -> Vec<SearchResult> {
        let query = request.query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for document in self.documents.values() {
            let Some(content) = &document.text_content else {
                continue;
            };
            let content_lower = content.to_lowercase();
            let title_lower = document.title.to_lowercase();
            let match_count =
                content_lower.matches(query.as_str()).count() + title_lower.matches(query.as_str()).count();
            if match_count == 0 {
                continue;
            }
            results.push(SearchResult {
                document: document.clone(),
                score: relevance_score(match_count, query.len(), content.len()),
                matches: line_matches(content, &query),
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(request.limit);
        results
    }
}

/// Frequency term capped at 1 (70%) blended with a match-density term (30%).
fn relevance_score(match_count: usize, query_len: usize, content_len: usize) -> f32 {
    let frequency = (match_count as f32 / 10.0).min(1.0);
    let density = if content_len == 0 {
        0.0
    } else {
        (match_count * query_len) as f32 / content_len as f32
    };
    frequency * 0.7 + density * 0.3
}

/// Locate up to [`MAX_MATCHES_PER_DOC`] occurrences at line granularity.
/// Every occurrence on a line counts, not just the first.
fn line_matches(content: &str, query_lower: &str) -> Vec<MatchContext> {
    let mut matches = Vec::new();
    'lines: for (i, line) in content.lines().enumerate() {
        let line_lower = line.to_lowercase();
        // Offsets come from the lowercased line; they map 1:1 onto the
        // original only while lowercasing preserved the byte length.
        let offsets_transfer = line_lower.len() == line.len();
        for (offset, _) in line_lower.match_indices(query_lower) {
            let (match_start, match_end, snippet_start, snippet_end) = if offsets_transfer {
                let start = floor_char_boundary(line, offset);
                let end = ceil_char_boundary(line, offset + query_lower.len());
                (
                    start,
                    end,
                    floor_char_boundary(line, start.saturating_sub(CONTEXT_RADIUS)),
                    ceil_char_boundary(line, end + CONTEXT_RADIUS),
                )
            } else {
                // Length-changing lowercase ('İ' and friends): byte offsets
                // into the original line are unreliable, so only the
                // line-level location is reported.
                (
                    0,
                    0,
                    0,
                    ceil_char_boundary(line, query_lower.len() + 2 * CONTEXT_RADIUS),
                )
            };
            matches.push(MatchContext {
                line_number: i + 1,
                snippet_text: line[snippet_start..snippet_end].to_string(),
                match_start,
                match_end,
            });
            if matches.len() >= MAX_MATCHES_PER_DOC {
                break 'lines;
            }
        }
    }
    matches
}

#[async_trait]
impl SearchEngine for LexicalSearchEngine {
    async fn index(&mut self, documents: Vec<Document>) -> Result<()> {
        LexicalSearchEngine::index(self, documents);
        Ok(())
    }

    async fn update(&mut self, document: Document) -> Result<()> {
        LexicalSearchEngine::update(self, document);
        Ok(())
    }

    async fn remove(&mut self, path: &str) -> Result<()> {
        LexicalSearchEngine::remove(self, path);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        Ok(LexicalSearchEngine::search(self, request))
    }

    async fn dispose(&mut self) -> Result<()> {
        // No disposable resources.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(docs: Vec<Document>) -> LexicalSearchEngine {
        let mut engine = LexicalSearchEngine::new();
        engine.index(docs);
        engine
    }

    #[test]
    fn empty_query_yields_no_results() {
        let engine = engine_with(vec![Document::new("a.md", "A", "anything at all")]);
        assert!(engine.search(&SearchRequest::new("")).is_empty());
        assert!(engine.search(&SearchRequest::new("   ")).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive_over_title_and_content() {
        let engine = engine_with(vec![
            Document::new("a.md", "Rust Guide", "nothing relevant here"),
            Document::new("b.md", "Misc", "all about RUST and more rust"),
            Document::new("c.md", "Misc", "unrelated"),
        ]);
        let results = engine.search(&SearchRequest::new("rust"));
        assert_eq!(results.len(), 2);
        let paths: Vec<&str> = results.iter().map(|r| r.document.path.as_str()).collect();
        assert!(paths.contains(&"a.md"));
        assert!(paths.contains(&"b.md"));
    }

    #[test]
    fn score_is_monotonic_in_match_count() {
        let engine = engine_with(vec![
            Document::new("few.md", "Doc", "apple pie with cream and sugar on top"),
            Document::new("many.md", "Doc", "apple apple with cream and sugar apple"),
        ]);
        let results = engine.search(&SearchRequest::new("apple"));
        assert_eq!(results[0].document.path, "many.md");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn match_contexts_cover_every_occurrence_on_a_line_up_to_cap() {
        let engine = engine_with(vec![Document::new(
            "a.md",
            "Doc",
            "fox fox fox\nno match here\nfox fox fox",
        )]);
        let results = engine.search(&SearchRequest::new("fox"));
        assert_eq!(results.len(), 1);
        let matches = &results[0].matches;
        assert_eq!(matches.len(), 5);
        assert_eq!(matches[0].line_number, 1);
        assert_eq!(matches[1].line_number, 1);
        assert_eq!(matches[2].line_number, 1);
        assert_eq!(matches[3].line_number, 3);
    }

    #[test]
    fn snippet_is_clipped_to_line_bounds() {
        let long_line = format!("{}needle{}", "x".repeat(200), "y".repeat(200));
        let engine = engine_with(vec![Document::new("a.md", "Doc", long_line)]);
        let results = engine.search(&SearchRequest::new("needle"));
        let ctx = &results[0].matches[0];
        assert_eq!(ctx.snippet_text.len(), 50 + "needle".len() + 50);
        assert!(ctx.snippet_text.contains("needle"));
    }

    #[test]
    fn length_changing_lowercase_reports_line_only() {
        // 'İ' lowercases to two code points, shifting every later offset.
        let engine = engine_with(vec![Document::new(
            "a.md",
            "Doc",
            "İstanbul travel fox notes",
        )]);
        let results = engine.search(&SearchRequest::new("fox"));
        assert_eq!(results.len(), 1);
        let ctx = &results[0].matches[0];
        assert_eq!(ctx.line_number, 1);
        assert_eq!((ctx.match_start, ctx.match_end), (0, 0));
        assert!(ctx.snippet_text.contains("fox"));
    }

    #[test]
    fn limit_truncates_results() {
        let docs: Vec<Document> = (0..8)
            .map(|i| Document::new(format!("d{i}.md"), "Doc", "shared term inside"))
            .collect();
        let engine = engine_with(docs);
        let results = engine.search(&SearchRequest::new("shared").with_limit(3));
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn update_and_remove_are_scoped_to_one_document() {
        let mut engine = engine_with(vec![Document::new("a.md", "A", "old words")]);
        engine.update(Document::new("a.md", "A", "fresh words"));
        assert_eq!(engine.document_count(), 1);
        assert_eq!(engine.search(&SearchRequest::new("fresh")).len(), 1);
        assert!(engine.search(&SearchRequest::new("old words")).is_empty());

        engine.remove("a.md");
        engine.remove("never-indexed.md");
        assert_eq!(engine.document_count(), 0);
    }

    #[test]
    fn documents_without_content_are_skipped() {
        let mut doc = Document::new("a.md", "needle title", "ignored");
        doc.text_content = None;
        let engine = engine_with(vec![doc]);
        assert!(engine.search(&SearchRequest::new("needle")).is_empty());
    }
}
