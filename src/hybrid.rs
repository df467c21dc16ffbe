//! Hybrid search engine: weighted fusion of lexical and semantic results.
//!
//! Owns one [`LexicalSearchEngine`] and one [`SemanticSearchEngine`], fans
//! index/update/remove out to both, runs both searches concurrently at
//! query time and merges the result sets by document path with a weighted
//! combined score.

use ahash::AHashMap;
use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::data::{Document, MatchContext, SearchRequest, SearchResult};
use crate::engine::SearchEngine;
use crate::error::Result;
use crate::lexical::LexicalSearchEngine;
use crate::semantic::SemanticSearchEngine;

const DEFAULT_KEYWORD_WEIGHT: f32 = 0.4;
const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.6;
/// Merged match lists are capped at this many contexts per document.
const MAX_MATCHES_PER_DOC: usize = 5;

/// Weighted-fusion engine over independent lexical and semantic children.
/// The children never share internal state; only their result lists are
/// combined.
pub struct HybridSearchEngine {
    keyword: LexicalSearchEngine,
    semantic: SemanticSearchEngine,
    documents: AHashMap<String, Document>,
    keyword_weight: f32,
    semantic_weight: f32,
}

impl HybridSearchEngine {
    /// Construct from configuration. Propagates the semantic engine's
    /// fail-fast construction errors (semantic disabled, missing
    /// credentials).
    pub async fn open(config: &SearchConfig) -> Result<Self> {
        let semantic = SemanticSearchEngine::open(config).await?;
        let (keyword_weight, semantic_weight) =
            normalize_weights(config.keyword_weight, config.semantic_weight);
        Ok(Self {
            keyword: LexicalSearchEngine::new(),
            semantic,
            documents: AHashMap::new(),
            keyword_weight,
            semantic_weight,
        })
    }

    pub fn weights(&self) -> (f32, f32) {
        (self.keyword_weight, self.semantic_weight)
    }

    /// Index into both children concurrently.
    pub async fn index(&mut self, documents: Vec<Document>) -> Result<()> {
        for document in &documents {
            self.documents
                .insert(document.path.clone(), document.clone());
        }
        let keyword = &mut self.keyword;
        let semantic = &mut self.semantic;
        let keyword_docs = documents.clone();
        let ((), semantic_result) = futures::join!(
            async move { keyword.index(keyword_docs) },
            semantic.index(documents)
        );
        semantic_result
    }

    /// Update both children concurrently.
    pub async fn update(&mut self, document: Document) -> Result<()> {
        self.documents
            .insert(document.path.clone(), document.clone());
        let keyword = &mut self.keyword;
        let semantic = &mut self.semantic;
        let keyword_doc = document.clone();
        let ((), semantic_result) = futures::join!(
            async move { keyword.update(keyword_doc) },
            semantic.update(document)
        );
        semantic_result
    }

    /// Remove from both children concurrently.
    pub async fn remove(&mut self, path: &str) -> Result<()> {
        self.documents.remove(path);
        let keyword = &mut self.keyword;
        let semantic = &mut self.semantic;
        let ((), semantic_result) =
            futures::join!(async move { keyword.remove(path) }, semantic.remove(path));
        semantic_result
    }

    /// Run both child searches concurrently and fuse the result sets.
    /// An empty query yields no results.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        if request.query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let keyword = &self.keyword;
        let (keyword_results, semantic_results) = futures::join!(
            async move { keyword.search(request) },
            self.semantic.search(request)
        );
        let semantic_results = semantic_results?;
        Ok(fuse(
            keyword_results,
            semantic_results,
            self.keyword_weight,
            self.semantic_weight,
            request.limit,
        ))
    }

    /// Only the semantic child holds disposable resources.
    pub async fn dispose(&mut self) -> Result<()> {
        self.semantic.dispose().await
    }
}

/// Renormalize configured fusion weights to sum to 1. Non-positive sums
/// fall back to the defaults.
fn normalize_weights(keyword: f32, semantic: f32) -> (f32, f32) {
    let keyword = keyword.max(0.0);
    let semantic = semantic.max(0.0);
    let sum = keyword + semantic;
    if sum <= 0.0 || !sum.is_finite() {
        return (DEFAULT_KEYWORD_WEIGHT, DEFAULT_SEMANTIC_WEIGHT);
    }
    (keyword / sum, semantic / sum)
}

/// Merge per-engine result lists by document path.
///
/// A document present in only one list gets score 0 for the missing
/// engine. Combined score = `keyword_score * keyword_weight +
/// semantic_score * semantic_weight`. Semantic matches are preferred;
/// lexical matches are appended when their snippet text is not already
/// present, up to [`MAX_MATCHES_PER_DOC`] total.
pub(crate) fn fuse(
    keyword: Vec<SearchResult>,
    semantic: Vec<SearchResult>,
    keyword_weight: f32,
    semantic_weight: f32,
    limit: usize,
) -> Vec<SearchResult> {
    struct Partial {
        document: Document,
        keyword_score: f32,
        semantic_score: f32,
        semantic_matches: Vec<MatchContext>,
        keyword_matches: Vec<MatchContext>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut merged: AHashMap<String, Partial> = AHashMap::new();

    for result in semantic {
        let path = result.document.path.clone();
        order.push(path.clone());
        merged.insert(
            path,
            Partial {
                document: result.document,
                keyword_score: 0.0,
                semantic_score: result.score,
                semantic_matches: result.matches,
                keyword_matches: Vec::new(),
            },
        );
    }
    for result in keyword {
        let path = result.document.path.clone();
        match merged.get_mut(&path) {
            Some(partial) => {
                partial.keyword_score = result.score;
                partial.keyword_matches = result.matches;
            }
            None => {
                order.push(path.clone());
                merged.insert(
                    path,
                    Partial {
                        document: result.document,
                        keyword_score: result.score,
                        semantic_score: 0.0,
                        semantic_matches: Vec::new(),
                        keyword_matches: result.matches,
                    },
                );
            }
        }
    }

    let mut results = Vec::with_capacity(order.len());
    for path in order {
        let Some(partial) = merged.remove(&path) else {
            continue;
        };
        let mut matches = partial.semantic_matches;
        for context in partial.keyword_matches {
            if matches.len() >= MAX_MATCHES_PER_DOC {
                break;
            }
            if matches.iter().any(|m| m.snippet_text == context.snippet_text) {
                continue;
            }
            matches.push(context);
        }
        matches.truncate(MAX_MATCHES_PER_DOC);
        results.push(SearchResult {
            document: partial.document,
            score: partial.keyword_score * keyword_weight
                + partial.semantic_score * semantic_weight,
            matches,
        });
    }
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    results
}

#[async_trait]
impl SearchEngine for HybridSearchEngine {
    async fn index(&mut self, documents: Vec<Document>) -> Result<()> {
        HybridSearchEngine::index(self, documents).await
    }

    async fn update(&mut self, document: Document) -> Result<()> {
        HybridSearchEngine::update(self, document).await
    }

    async fn remove(&mut self, path: &str) -> Result<()> {
        HybridSearchEngine::remove(self, path).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        HybridSearchEngine::search(self, request).await
    }

    async fn dispose(&mut self) -> Result<()> {
        HybridSearchEngine::dispose(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, score: f32, snippets: &[&str]) -> SearchResult {
        SearchResult {
            document: Document::new(path, path, "content"),
            score,
            matches: snippets
                .iter()
                .enumerate()
                .map(|(i, s)| MatchContext {
                    line_number: i + 1,
                    snippet_text: s.to_string(),
                    match_start: 0,
                    match_end: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn combined_score_follows_weighted_formula() {
        let keyword = vec![result("doc.md", 0.8, &["kw"])];
        let semantic = vec![result("doc.md", 0.6, &["sem"])];
        let fused = fuse(keyword, semantic, 0.7, 0.3, 10);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 0.74).abs() < 1e-6);
    }

    #[test]
    fn missing_engine_score_counts_as_zero() {
        let keyword = vec![result("only-kw.md", 0.5, &[])];
        let semantic = vec![result("only-sem.md", 0.5, &[])];
        let fused = fuse(keyword, semantic, 0.5, 0.5, 10);
        assert_eq!(fused.len(), 2);
        for r in &fused {
            assert!((r.score - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn matches_prefer_semantic_then_dedup_lexical() {
        let keyword = vec![result("doc.md", 0.4, &["shared", "kw-only"])];
        let semantic = vec![result("doc.md", 0.4, &["shared", "sem-only"])];
        let fused = fuse(keyword, semantic, 0.5, 0.5, 10);
        let snippets: Vec<&str> = fused[0]
            .matches
            .iter()
            .map(|m| m.snippet_text.as_str())
            .collect();
        assert_eq!(snippets, vec!["shared", "sem-only", "kw-only"]);
    }

    #[test]
    fn merged_matches_capped_at_five() {
        let keyword = vec![result("doc.md", 0.4, &["k1", "k2", "k3", "k4"])];
        let semantic = vec![result("doc.md", 0.4, &["s1", "s2", "s3"])];
        let fused = fuse(keyword, semantic, 0.5, 0.5, 10);
        assert_eq!(fused[0].matches.len(), 5);
        assert_eq!(fused[0].matches[0].snippet_text, "s1");
    }

    #[test]
    fn fused_results_sorted_and_truncated() {
        let keyword = vec![
            result("a.md", 0.2, &[]),
            result("b.md", 0.9, &[]),
            result("c.md", 0.5, &[]),
        ];
        let fused = fuse(keyword, Vec::new(), 1.0, 0.0, 2);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].document.path, "b.md");
        assert_eq!(fused[1].document.path, "c.md");
    }

    #[test]
    fn weights_are_renormalized() {
        let (k, s) = normalize_weights(0.7, 0.3);
        assert!((k - 0.7).abs() < 1e-6 && (s - 0.3).abs() < 1e-6);
        let (k, s) = normalize_weights(2.0, 2.0);
        assert!((k - 0.5).abs() < 1e-6 && (s - 0.5).abs() < 1e-6);
        assert_eq!(
            normalize_weights(0.0, 0.0),
            (DEFAULT_KEYWORD_WEIGHT, DEFAULT_SEMANTIC_WEIGHT)
        );
    }
}
