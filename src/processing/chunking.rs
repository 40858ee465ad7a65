//! Recursive boundary chunking with character overlap.
//!
//! How chunk boundaries are chosen:
//!
//! - Sizes are measured in characters (Unicode scalar values), never bytes, and every offset
//!   reported on a [`TextChunk`] indexes characters of the original text.
//! - A span is partitioned at the coarsest separator it contains (paragraph break, line break,
//!   space). Partitions still larger than the budget are split again with the next separator; when
//!   none is left they are cut at a fixed character count.
//! - Partitions are accumulated greedily into source spans of at most `chunk_size - overlap`
//!   characters, so that prepending up to `overlap` characters of the predecessor keeps every
//!   chunk within `chunk_size`.
//! - The overlap is taken from the tail of the previous source span and moved forward to the next
//!   word start when one exists inside it. A chunk's content is always the exact slice
//!   `text[start_char..end_char]`.
//!
//! Identical `(text, chunk_size, overlap)` inputs always produce identical output.

use super::types::ChunkingError;

/// Separators tried from coarsest to finest. The empty separator stands for a hard cut.
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A chunk produced by [`split_text`], positioned against the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Zero-based position of the chunk within the document.
    pub chunk_index: usize,
    /// Character offset of the first character (inclusive).
    pub start_char: usize,
    /// Character offset one past the last character (exclusive).
    pub end_char: usize,
    /// Exact slice of the original text covered by the chunk.
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn len(self) -> usize {
        self.end - self.start
    }
}

/// Maps character offsets to byte offsets and back.
struct CharTable<'a> {
    text: &'a str,
    byte_offsets: Vec<usize>,
}

impl<'a> CharTable<'a> {
    fn new(text: &'a str) -> Self {
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        byte_offsets.push(text.len());
        Self { text, byte_offsets }
    }

    fn char_len(&self) -> usize {
        self.byte_offsets.len() - 1
    }

    fn byte_at(&self, char_offset: usize) -> usize {
        self.byte_offsets[char_offset]
    }

    fn char_at(&self, byte_offset: usize) -> usize {
        match self.byte_offsets.binary_search(&byte_offset) {
            Ok(index) | Err(index) => index,
        }
    }

    fn slice(&self, span: Span) -> &'a str {
        &self.text[self.byte_at(span.start)..self.byte_at(span.end)]
    }
}

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
///
/// - `overlap` must be smaller than `chunk_size`.
/// - Returns an empty vector when the text is empty or all whitespace.
/// - Text no longer than `chunk_size` yields exactly one chunk starting at offset 0.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<TextChunk>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::InvalidOverlap {
            overlap,
            chunk_size,
        });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let table = CharTable::new(text);
    let total = table.char_len();
    if total <= chunk_size {
        return Ok(vec![TextChunk {
            chunk_index: 0,
            start_char: 0,
            end_char: total,
            content: text.to_string(),
        }]);
    }

    let budget = chunk_size - overlap;
    let mut pieces = Vec::new();
    split_span(
        &table,
        Span {
            start: 0,
            end: total,
        },
        &SEPARATORS,
        budget,
        &mut pieces,
    );
    let sources = merge_pieces(&pieces, budget);
    let chunks: Vec<TextChunk> = apply_overlap(&table, &sources, overlap)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, span)| TextChunk {
            chunk_index,
            start_char: span.start,
            end_char: span.end,
            content: table.slice(span).to_string(),
        })
        .collect();

    if chunks.is_empty() {
        return Err(ChunkingError::EmptyOutput { chars: total });
    }
    Ok(chunks)
}

/// Partition `span` into pieces of at most `budget` characters, appending them to `out` in order.
fn split_span(
    table: &CharTable<'_>,
    span: Span,
    separators: &[&str],
    budget: usize,
    out: &mut Vec<Span>,
) {
    if span.len() <= budget {
        out.push(span);
        return;
    }

    let slice = table.slice(span);
    let found = separators
        .iter()
        .enumerate()
        .find(|(_, separator)| !separator.is_empty() && slice.contains(**separator));
    let Some((position, separator)) = found else {
        hard_cut(span, budget, out);
        return;
    };

    let finer = &separators[position + 1..];
    let base_byte = table.byte_at(span.start);
    let mut cursor = span.start;
    // The separator stays attached to the partition it terminates, so partitions tile the span.
    for (offset, _) in slice.match_indices(*separator) {
        let end = table.char_at(base_byte + offset + separator.len());
        if end > cursor {
            split_span(table, Span { start: cursor, end }, finer, budget, out);
            cursor = end;
        }
    }
    if cursor < span.end {
        split_span(
            table,
            Span {
                start: cursor,
                end: span.end,
            },
            finer,
            budget,
            out,
        );
    }
}

fn hard_cut(span: Span, budget: usize, out: &mut Vec<Span>) {
    let mut start = span.start;
    while start < span.end {
        let end = (start + budget).min(span.end);
        out.push(Span { start, end });
        start = end;
    }
}

/// Greedily join consecutive pieces while the joined span stays within `budget`.
fn merge_pieces(pieces: &[Span], budget: usize) -> Vec<Span> {
    let mut merged = Vec::new();
    let mut current: Option<Span> = None;

    for &piece in pieces {
        current = Some(match current {
            Some(run) if piece.end - run.start <= budget => Span {
                start: run.start,
                end: piece.end,
            },
            Some(run) => {
                merged.push(run);
                piece
            }
            None => piece,
        });
    }

    merged.extend(current);
    merged
}

/// Extend every source span after the first backwards into its predecessor.
fn apply_overlap(table: &CharTable<'_>, sources: &[Span], overlap: usize) -> Vec<Span> {
    let mut chunks: Vec<Span> = Vec::with_capacity(sources.len());

    for (index, source) in sources.iter().enumerate() {
        let start = match (index.checked_sub(1), chunks.last()) {
            (Some(previous_index), Some(previous_chunk)) => {
                let previous_source = sources[previous_index];
                let earliest = source
                    .start
                    .saturating_sub(overlap)
                    .max(previous_source.start)
                    .max(previous_chunk.start + 1);
                snap_to_word_start(table, earliest, source.start)
            }
            _ => source.start,
        };
        chunks.push(Span {
            start,
            end: source.end,
        });
    }

    chunks
}

/// First word start in `earliest..limit`, or `earliest` when the region holds none.
fn snap_to_word_start(table: &CharTable<'_>, earliest: usize, limit: usize) -> usize {
    if earliest == 0 || earliest >= limit {
        return earliest;
    }

    let region = table.slice(Span {
        start: earliest - 1,
        end: limit,
    });
    let mut previous_is_space = false;
    for (index, ch) in region.chars().enumerate() {
        if index > 0 && previous_is_space && !ch.is_whitespace() {
            return earliest - 1 + index;
        }
        previous_is_space = ch.is_whitespace();
    }
    earliest
}
