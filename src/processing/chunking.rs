//! Character-budget chunking with sliding overlap.
//!
//! How documents are cut into retrieval units:
//!
//! - Base segmentation: `semchunk-rs` recursively splits on paragraph, line, sentence and word
//!   boundaries until every segment fits `chunk_size`.
//! - Overlap: each chunk after the first is prefixed with up to `chunk_overlap` units taken from the
//!   tail of its predecessor, starting on a word boundary.
//! - Units: characters by default (`TEXT_SPLITTER_UNIT=chars`); `tokens` counts `cl100k_base`
//!   tokens through `tiktoken-rs` and falls back to whitespace words if the encoding cannot load.

use crate::config::ChunkUnit;
use semchunk_rs::Chunker;
use std::sync::Arc;
use tiktoken_rs::cl100k_base;

use super::types::ChunkingError;

type LengthCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Splits document text into overlapping chunks.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    unit: ChunkUnit,
}

impl TextSplitter {
    /// Create a splitter producing chunks of at most `chunk_size` units.
    pub const fn new(chunk_size: usize, chunk_overlap: usize, unit: ChunkUnit) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            unit,
        }
    }

    /// Split `text` into chunks. Whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        chunk_text(text, self.chunk_size, self.chunk_overlap, self.unit)
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(500, 100, ChunkUnit::Characters)
    }
}

/// Chunk text using the counter for `unit`.
///
/// - `chunk_size` is a hard upper bound on each chunk's length.
/// - `overlap` is capped at `chunk_size - 1`.
pub(crate) fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    unit: ChunkUnit,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let counter = build_length_counter(unit)?;
    Ok(chunk_text_with_counter(text, chunk_size, overlap, counter))
}

/// Build the length counter for a unit.
pub(crate) fn build_length_counter(unit: ChunkUnit) -> Result<LengthCounter, ChunkingError> {
    match unit {
        ChunkUnit::Characters => Ok(char_counter()),
        ChunkUnit::Tokens => match cl100k_base() {
            Ok(encoding) => {
                let encoding = Arc::new(encoding);
                Ok(Arc::new(move |segment: &str| {
                    encoding.encode_ordinary(segment).len()
                }))
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "cl100k_base unavailable; falling back to whitespace counter"
                );
                Ok(whitespace_counter())
            }
        },
    }
}

fn char_counter() -> LengthCounter {
    Arc::new(|segment: &str| segment.chars().count())
}

fn whitespace_counter() -> LengthCounter {
    Arc::new(|segment: &str| {
        let words = segment.split_whitespace().count();
        if words == 0 && !segment.is_empty() {
            1
        } else {
            words
        }
    })
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    counter: LengthCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    let base_budget = chunk_size - effective_overlap;
    let base_chunks = base_chunks(text, base_budget, &counter);
    apply_overlap(base_chunks, chunk_size, effective_overlap, &counter)
}

/// Segment `text` with semchunk and enforce `budget` on every segment.
///
/// semchunk can merge one split past its budget. An oversized segment is re-packed and its last
/// piece is carried into the span of the next segment, so packing stays greedy and the original
/// separators survive.
fn base_chunks(text: &str, budget: usize, counter: &LengthCounter) -> Vec<String> {
    let counter_for_chunker = counter.clone();
    let chunker = Chunker::new(
        budget,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );

    let mut chunks = Vec::new();
    let mut cursor = 0;
    let mut carried: Option<usize> = None;
    for segment in chunker.chunk(text) {
        if segment.trim().is_empty() {
            continue;
        }
        let Some(found) = text[cursor..].find(segment.as_str()) else {
            if let Some(start) = carried.take() {
                chunks.extend(split_to_budget(&text[start..cursor], budget, counter));
            }
            chunks.extend(split_to_budget(&segment, budget, counter));
            continue;
        };

        let end = cursor + found + segment.len();
        let start = carried.take().unwrap_or(cursor + found);
        let span = &text[start..end];
        let mut pieces = split_ranges(span, budget, counter);
        if pieces.len() > 1 {
            carried = pieces.pop().map(|(piece_start, _)| start + piece_start);
        }
        chunks.extend(
            pieces
                .into_iter()
                .map(|(piece_start, piece_end)| span[piece_start..piece_end].to_string()),
        );
        cursor = end;
    }
    if let Some(start) = carried {
        chunks.extend(split_to_budget(&text[start..cursor], budget, counter));
    }
    chunks
}

/// Prefix every chunk after the first with up to `overlap` units from the end of its predecessor.
///
/// Tails start on a word boundary. The combined chunk loses leading words until it fits
/// `chunk_size`.
fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &LengthCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter();
    let Some(mut previous) = iter.next() else {
        return overlapped;
    };
    overlapped.push(trim_to_budget(&previous, chunk_size, counter));

    for current in iter {
        let tail = tail_within_limit(&previous, effective_overlap, counter);
        let combined = if tail.is_empty() {
            current.clone()
        } else if starts_with_whitespace(&current) {
            format!("{tail}{current}")
        } else {
            format!("{tail} {current}")
        };
        overlapped.push(trim_to_budget(&combined, chunk_size, counter));
        previous = current;
    }

    overlapped
}

#[derive(Debug, Clone, Copy)]
enum Boundary {
    LineBreak,
    Whitespace,
}

/// Split `text` into pieces of at most `budget` units.
///
/// Pieces break at line breaks first, then between words, and only split a word that alone
/// exceeds the budget.
fn split_to_budget(text: &str, budget: usize, counter: &LengthCounter) -> Vec<String> {
    split_ranges(text, budget, counter)
        .into_iter()
        .map(|(start, end)| text[start..end].to_string())
        .collect()
}

/// Byte ranges of the pieces [`split_to_budget`] would return.
fn split_ranges(text: &str, budget: usize, counter: &LengthCounter) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    pack_segments(text, 0, Some(Boundary::LineBreak), budget, counter, &mut ranges);
    ranges
}

fn pack_segments(
    text: &str,
    offset: usize,
    boundary: Option<Boundary>,
    budget: usize,
    counter: &LengthCounter,
    out: &mut Vec<(usize, usize)>,
) {
    let Some(boundary) = boundary else {
        split_chars(text, offset, budget, counter, out);
        return;
    };
    let finer = match boundary {
        Boundary::LineBreak => Some(Boundary::Whitespace),
        Boundary::Whitespace => None,
    };

    let mut piece: Option<(usize, usize)> = None;
    for (start, end) in segment_spans(text, boundary) {
        if let Some((piece_start, piece_end)) = piece {
            if counter.as_ref()(&text[piece_start..end]) <= budget {
                piece = Some((piece_start, end));
                continue;
            }
            out.push((offset + piece_start, offset + piece_end));
            piece = None;
        }

        if counter.as_ref()(&text[start..end]) <= budget {
            piece = Some((start, end));
        } else {
            pack_segments(&text[start..end], offset + start, finer, budget, counter, out);
        }
    }
    if let Some((piece_start, piece_end)) = piece {
        out.push((offset + piece_start, offset + piece_end));
    }
}

fn split_chars(
    text: &str,
    offset: usize,
    budget: usize,
    counter: &LengthCounter,
    out: &mut Vec<(usize, usize)>,
) {
    let mut start = 0;
    let mut end = 0;
    for (index, c) in text.char_indices() {
        let next_end = index + c.len_utf8();
        if end > start && counter.as_ref()(&text[start..next_end]) > budget {
            out.push((offset + start, offset + end));
            start = index;
        }
        end = next_end;
    }
    if end > start {
        out.push((offset + start, offset + end));
    }
}

/// Byte ranges of the non-separator runs in `text`.
///
/// With [`Boundary::LineBreak`] only whitespace runs containing a line break separate segments.
fn segment_spans(text: &str, boundary: Boundary) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut segment_start: Option<usize> = None;
    let mut run_start: Option<usize> = None;
    let mut run_breaks = false;

    for (index, c) in text.char_indices() {
        if c.is_whitespace() {
            if run_start.is_none() {
                run_start = Some(index);
                run_breaks = false;
            }
            run_breaks |= matches!(boundary, Boundary::Whitespace) || c == '\n' || c == '\r';
            continue;
        }
        if let Some(run) = run_start.take() {
            if run_breaks {
                if let Some(start) = segment_start.take() {
                    spans.push((start, run));
                }
            }
        }
        if segment_start.is_none() {
            segment_start = Some(index);
        }
    }
    if let Some(start) = segment_start {
        spans.push((start, run_start.unwrap_or(text.len())));
    }
    spans
}

/// Longest run of whole trailing words of `text` measuring at most `limit`.
fn tail_within_limit<'a>(text: &'a str, limit: usize, counter: &LengthCounter) -> &'a str {
    let text = text.trim_end();
    let mut tail = "";
    for (start, _) in segment_spans(text, Boundary::Whitespace).into_iter().rev() {
        let candidate = &text[start..];
        if counter.as_ref()(candidate) > limit {
            break;
        }
        tail = candidate;
    }
    tail
}

/// Drop leading words until `text` fits `budget`.
fn trim_to_budget(text: &str, budget: usize, counter: &LengthCounter) -> String {
    if counter.as_ref()(text) <= budget {
        return text.to_string();
    }
    for (start, _) in segment_spans(text, Boundary::Whitespace).into_iter().skip(1) {
        let suffix = &text[start..];
        if counter.as_ref()(suffix) <= budget {
            return suffix.to_string();
        }
    }
    split_to_budget(text, budget, counter)
        .pop()
        .unwrap_or_default()
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}
