//! Document chunking for embedding.
//!
//! Splits a document's text into overlapping segments sized in estimated
//! tokens, preserving paragraph boundaries and (optionally) fenced code
//! blocks. Chunk ids are deterministic per `(path, index)` pair so stale
//! chunks can be removed by id before a document is re-indexed.

use serde::{Deserialize, Serialize};

use crate::data::Document;

fn default_max_chunk_size() -> usize {
    512
}

fn default_overlap_size() -> usize {
    50
}

fn default_true() -> bool {
    true
}

/// Chunking options. Sizes are in estimated tokens, not characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum estimated tokens per chunk.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Estimated tokens of trailing context carried into the next chunk.
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
    /// Accumulate whole paragraphs (default) instead of single lines.
    #[serde(default = "default_true")]
    pub chunk_by_paragraph: bool,
    /// Treat a fenced code block as one indivisible paragraph.
    #[serde(default = "default_true")]
    pub preserve_code_blocks: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap_size: default_overlap_size(),
            chunk_by_paragraph: true,
            preserve_code_blocks: true,
        }
    }
}

/// A bounded, contiguous slice of a document's text sized for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Deterministic id: `hash(parent_path)` in hex, `_`, `chunk_index`.
    pub id: String,
    /// Chunk text.
    pub content: String,
    /// First source line covered, 1-based inclusive. Overlap lines keep
    /// their original numbers, so this may point back into the previous
    /// chunk's range.
    pub start_line: usize,
    /// Last source line covered, 1-based inclusive.
    pub end_line: usize,
    /// Position within the document, contiguous from 0.
    pub chunk_index: usize,
    /// Title of the source document.
    pub parent_title: String,
    /// Path of the source document.
    pub parent_path: String,
    /// Total number of chunks emitted for the source document.
    pub total_chunks: usize,
}

/// Estimated token count: `ceil(bytes / 4)`. A deliberate simplification,
/// not a real tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Deterministic chunk id for a `(path, index)` pair.
pub fn chunk_id(path: &str, index: usize) -> String {
    format!("{:08x}_{}", crc32fast::hash(path.as_bytes()), index)
}

/// A source line with its original 1-based number.
#[derive(Debug, Clone)]
struct Line {
    number: usize,
    text: String,
}

/// A run of lines accumulated as one indivisible unit: a paragraph, a
/// fenced code block, or a single line in size-based mode.
#[derive(Debug, Clone)]
struct Unit {
    lines: Vec<Line>,
}

impl Unit {
    fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tokens(&self) -> usize {
        estimate_tokens(&self.text())
    }
}

/// Splits documents into [`DocumentChunk`]s according to a [`ChunkerConfig`].
#[derive(Debug, Clone, Default)]
pub struct DocumentChunker {
    config: ChunkerConfig,
}

impl DocumentChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk a document's text. Documents without content, or with only
    /// blank content, yield no chunks.
    pub fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        let text = match &document.text_content {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Vec::new(),
        };

        let units = if self.config.chunk_by_paragraph {
            self.split_paragraphs(text)
        } else {
            split_lines(text)
        };
        let separator = if self.config.chunk_by_paragraph {
            "\n\n"
        } else {
            "\n"
        };

        let raw = self.accumulate(units, separator);
        let total = raw.len();
        raw.into_iter()
            .enumerate()
            .map(|(index, piece)| DocumentChunk {
                id: chunk_id(&document.path, index),
                content: piece.content,
                start_line: piece.start_line,
                end_line: piece.end_line,
                chunk_index: index,
                parent_title: document.title.clone(),
                parent_path: document.path.clone(),
                total_chunks: total,
            })
            .collect()
    }

    /// Split text into paragraphs: maximal runs of non-blank lines. Blank
    /// lines separate paragraphs but still consume a line number. When code
    /// block preservation is on, blank lines inside a fence do not split.
    fn split_paragraphs(&self, text: &str) -> Vec<Unit> {
        let mut units = Vec::new();
        let mut current: Vec<Line> = Vec::new();
        let mut in_fence = false;

        for (i, raw) in text.lines().enumerate() {
            let number = i + 1;
            let is_fence_delimiter =
                self.config.preserve_code_blocks && raw.trim_start().starts_with("```");
            if raw.trim().is_empty() && !in_fence {
                if !current.is_empty() {
                    units.push(Unit {
                        lines: std::mem::take(&mut current),
                    });
                }
                continue;
            }
            current.push(Line {
                number,
                text: raw.to_string(),
            });
            if is_fence_delimiter {
                in_fence = !in_fence;
                // Closing fence ends the paragraph so the block stays one unit.
                if !in_fence {
                    units.push(Unit {
                        lines: std::mem::take(&mut current),
                    });
                }
            }
        }
        if !current.is_empty() {
            units.push(Unit { lines: current });
        }
        units
    }

    /// Sliding-window accumulation of units into chunk pieces.
    fn accumulate(&self, units: Vec<Unit>, separator: &str) -> Vec<RawChunk> {
        let max = self.config.max_chunk_size;
        let mut pieces: Vec<RawChunk> = Vec::new();
        let mut buffer: Vec<Unit> = Vec::new();

        for unit in units {
            if unit.tokens() > max {
                // Oversized unit: flush what we have, then split it
                // internally line by line with no overlap.
                flush(&mut pieces, &mut buffer, separator);
                self.split_oversized(&mut pieces, unit);
                continue;
            }
            if !buffer.is_empty() && render_tokens(&buffer, &unit, separator) > max {
                let overlap = self.overlap_lines(&buffer);
                flush(&mut pieces, &mut buffer, separator);
                if let Some(seed) = overlap {
                    buffer.push(seed);
                }
            }
            buffer.push(unit);
        }
        flush(&mut pieces, &mut buffer, separator);
        pieces
    }

    /// Split a unit larger than `max_chunk_size` into line-grained pieces.
    /// A single line larger than the budget is emitted as its own chunk
    /// rather than cut mid-line.
    fn split_oversized(&self, pieces: &mut Vec<RawChunk>, unit: Unit) {
        let max = self.config.max_chunk_size;
        let mut sub: Vec<Line> = Vec::new();
        let mut sub_bytes = 0usize;
        for line in unit.lines {
            let candidate = if sub.is_empty() {
                line.text.len()
            } else {
                sub_bytes + 1 + line.text.len()
            };
            if !sub.is_empty() && candidate.div_ceil(4) > max {
                push_lines(pieces, std::mem::take(&mut sub));
                sub_bytes = line.text.len();
            } else {
                sub_bytes = candidate;
            }
            sub.push(line);
        }
        push_lines(pieces, sub);
    }

    /// Trailing lines of the buffer whose estimated size reaches
    /// `overlap_size`, preserving original line numbers.
    fn overlap_lines(&self, buffer: &[Unit]) -> Option<Unit> {
        if self.config.overlap_size == 0 {
            return None;
        }
        let mut taken: Vec<Line> = Vec::new();
        let mut bytes = 0usize;
        for line in buffer.iter().flat_map(|u| u.lines.iter()).rev() {
            if !taken.is_empty() && estimate_tokens_of_bytes(bytes) >= self.config.overlap_size {
                break;
            }
            bytes += line.text.len() + 1;
            taken.push(line.clone());
        }
        if taken.is_empty() {
            return None;
        }
        taken.reverse();
        Some(Unit { lines: taken })
    }
}

#[derive(Debug)]
struct RawChunk {
    content: String,
    start_line: usize,
    end_line: usize,
}

fn estimate_tokens_of_bytes(bytes: usize) -> usize {
    bytes.div_ceil(4)
}

fn split_lines(text: &str) -> Vec<Unit> {
    text.lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(i, raw)| Unit {
            lines: vec![Line {
                number: i + 1,
                text: raw.to_string(),
            }],
        })
        .collect()
}

fn render(buffer: &[Unit], separator: &str) -> String {
    buffer
        .iter()
        .map(Unit::text)
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_tokens(buffer: &[Unit], extra: &Unit, separator: &str) -> usize {
    let existing: usize = buffer.iter().map(|u| u.text().len()).sum();
    let separators = buffer.len() * separator.len();
    estimate_tokens_of_bytes(existing + separators + extra.text().len())
}

fn flush(pieces: &mut Vec<RawChunk>, buffer: &mut Vec<Unit>, separator: &str) {
    if buffer.is_empty() {
        return;
    }
    let content = render(buffer, separator);
    let start_line = buffer[0].lines[0].number;
    let end_line = buffer
        .last()
        .and_then(|u| u.lines.last())
        .map(|l| l.number)
        .unwrap_or(start_line);
    pieces.push(RawChunk {
        content,
        start_line,
        end_line,
    });
    buffer.clear();
}

fn push_lines(pieces: &mut Vec<RawChunk>, lines: Vec<Line>) {
    if lines.is_empty() {
        return;
    }
    let start_line = lines[0].number;
    let end_line = lines[lines.len() - 1].number;
    let content = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    pieces.push(RawChunk {
        content,
        start_line,
        end_line,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document::new("notes/sample.md", "Sample", content)
    }

    fn chunker(max: usize, overlap: usize) -> DocumentChunker {
        DocumentChunker::new(ChunkerConfig {
            max_chunk_size: max,
            overlap_size: overlap,
            chunk_by_paragraph: true,
            preserve_code_blocks: true,
        })
    }

    #[test]
    fn empty_and_blank_input_yield_no_chunks() {
        let c = DocumentChunker::default();
        assert!(c.chunk(&doc("")).is_empty());
        assert!(c.chunk(&doc("   \n\n  \t\n")).is_empty());
        let mut unloaded = doc("text");
        unloaded.text_content = None;
        assert!(c.chunk(&unloaded).is_empty());
    }

    #[test]
    fn single_line_document_yields_one_chunk() {
        let c = DocumentChunker::default();
        let chunks = c.chunk(&doc("just one line"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "just one line");
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[test]
    fn chunk_ids_are_deterministic_and_unique_per_path() {
        assert_eq!(chunk_id("a.md", 0), chunk_id("a.md", 0));
        assert_ne!(chunk_id("a.md", 0), chunk_id("a.md", 1));
        assert_ne!(chunk_id("a.md", 0), chunk_id("b.md", 0));
    }

    #[test]
    fn rechunking_identical_content_is_idempotent() {
        let c = chunker(20, 5);
        let text = "alpha beta gamma delta\n\nepsilon zeta eta theta\n\niota kappa lambda mu nu";
        let first = c.chunk(&doc(text));
        let second = c.chunk(&doc(text));
        assert_eq!(first, second);
        for (i, chunk) in first.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.total_chunks, first.len());
        }
    }

    #[test]
    fn paragraph_boundaries_respected() {
        let c = chunker(10, 0);
        // Two paragraphs, each ~6 tokens: cannot share a 10-token chunk.
        let text = "one two three four five\n\nsix seven eight nine ten";
        let chunks = c.chunk(&doc(text));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "one two three four five");
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[1].content, "six seven eight nine ten");
        assert_eq!(chunks[1].start_line, 3);
    }

    #[test]
    fn fenced_code_block_is_never_split() {
        let c = chunker(200, 0);
        let text = "intro paragraph\n\n```rust\nfn main() {\n\n    println!(\"hi\");\n}\n```\n\noutro";
        let chunks = c.chunk(&doc(text));
        let with_block: Vec<_> = chunks
            .iter()
            .filter(|ch| ch.content.contains("```rust"))
            .collect();
        assert_eq!(with_block.len(), 1);
        // Both delimiters, including the blank line inside the fence.
        assert!(with_block[0].content.contains("```rust\nfn main() {\n\n"));
        assert!(with_block[0].content.trim_end().contains("```"));
    }

    #[test]
    fn fenced_block_kept_whole_in_single_chunk() {
        let c = chunker(500, 0);
        let text = "```\nlet a = 1;\nlet b = 2;\n```";
        let chunks = c.chunk(&doc(text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 4);
    }

    #[test]
    fn oversized_paragraph_is_split_by_line() {
        let c = chunker(10, 5);
        // One paragraph of 4 lines, each 10 tokens: far over the budget.
        let line = "a".repeat(40);
        let text = format!("{line}\n{line}\n{line}\n{line}");
        let chunks = c.chunk(&doc(&text));
        assert!(chunks.len() >= 4);
        for ch in &chunks {
            assert!(estimate_tokens(&ch.content) <= 11);
        }
    }

    #[test]
    fn overlap_repeats_trailing_lines() {
        let c = chunker(15, 4);
        let text = "first paragraph line one\nsecond line here\n\nnext paragraph with more words in it";
        let chunks = c.chunk(&doc(&text));
        assert_eq!(chunks.len(), 2);
        // Second chunk is seeded with the tail of the first.
        assert!(chunks[1].content.contains("second line here"));
        assert!(chunks[1].start_line <= chunks[0].end_line);
    }

    #[test]
    fn size_based_mode_accumulates_lines() {
        let c = DocumentChunker::new(ChunkerConfig {
            max_chunk_size: 10,
            overlap_size: 0,
            chunk_by_paragraph: false,
            preserve_code_blocks: false,
        });
        let text = "aaaa bbbb cccc\ndddd eeee ffff\ngggg hhhh iiii";
        let chunks = c.chunk(&doc(text));
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_line, 1);
        let last = chunks.last().unwrap();
        assert_eq!(last.end_line, 3);
    }

    #[test]
    fn token_estimate_is_ceil_of_quarter_length() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
