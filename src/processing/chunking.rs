//! Character-budget chunking of page text.
//!
//! Highlights:
//!
//! - Semantic splitting: `semchunk-rs` breaks text at the most meaningful boundary available
//!   (paragraphs, lines, sentences, words, then characters) while respecting a length budget.
//! - Length is measured in characters, not bytes or tokens.
//! - Overlap: each chunk after the first is prefixed with up to `overlap` trailing characters of
//!   its predecessor so that spans around boundaries stay retrievable. Base chunks are sized at
//!   `chunk_size - overlap` to leave room for that prefix.
//! - Chunks never cross page boundaries.

use super::types::{Chunk, ChunkingError, PageText};
use semchunk_rs::Chunker;
use std::ops::Range;

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingSettings {
    fn validate(self) -> Result<Self, ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkingError::InvalidOverlap {
                overlap: self.chunk_overlap,
                chunk_size: self.chunk_size,
            });
        }
        Ok(self)
    }
}

/// Split every page into chunks, preserving page order.
pub fn split_pages(
    pages: &[PageText],
    settings: ChunkingSettings,
) -> Result<Vec<Chunk>, ChunkingError> {
    let settings = settings.validate()?;
    let mut chunks = Vec::new();
    for page in pages {
        chunks.extend(
            chunk_text(&page.text, settings)?
                .into_iter()
                .map(|text| Chunk {
                    page_number: page.page_number,
                    text,
                }),
        );
    }
    Ok(chunks)
}

/// Chunk a single text into overlapping windows of at most `chunk_size` characters.
///
/// Returns an empty vector when the input is all whitespace.
pub fn chunk_text(text: &str, settings: ChunkingSettings) -> Result<Vec<String>, ChunkingError> {
    let ChunkingSettings {
        chunk_size,
        chunk_overlap,
    } = settings.validate()?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let base_chunks = base_chunks(text, chunk_size - chunk_overlap);
    Ok(apply_overlap(base_chunks, chunk_size, chunk_overlap))
}

/// Split `text` into pieces of at most `base_size` characters.
///
/// semchunk falls back to byte offsets when a segment has no separator, which breaks on
/// multibyte text. Whitespace-free runs longer than `base_size` are therefore cut into
/// character windows here, and only stretches that contain whitespace reach the chunker.
fn base_chunks(text: &str, base_size: usize) -> Vec<String> {
    let chunker = Chunker::new(base_size, Box::new(char_count));
    let mut chunks = Vec::new();
    let mut cursor = 0;
    for run in long_runs(text, base_size) {
        push_stretch(&chunker, &text[cursor..run.start], &mut chunks);
        chunks.extend(char_windows(&text[run.clone()], base_size));
        cursor = run.end;
    }
    push_stretch(&chunker, &text[cursor..], &mut chunks);
    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

fn push_stretch(chunker: &Chunker, stretch: &str, chunks: &mut Vec<String>) {
    let stretch = stretch.trim();
    if stretch.is_empty() {
        return;
    }
    if stretch.contains(char::is_whitespace) {
        chunks.extend(chunker.chunk(stretch));
    } else {
        // a single run that already fits
        chunks.push(stretch.to_string());
    }
}

/// Byte ranges of whitespace-free runs longer than `limit` characters.
fn long_runs(text: &str, limit: usize) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut length = 0;
    for (offset, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(run_start) = start.take().filter(|_| length > limit) {
                runs.push(run_start..offset);
            }
            length = 0;
        } else {
            start.get_or_insert(offset);
            length += 1;
        }
    }
    if let Some(run_start) = start.filter(|_| length > limit) {
        runs.push(run_start..text.len());
    }
    runs
}

fn char_windows(run: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = run.chars().collect();
    chars
        .chunks(size)
        .map(|window| window.iter().collect())
        .collect()
}

fn char_count(segment: &str) -> usize {
    segment.chars().count()
}

/// Prefix each chunk with the tail of the previous base chunk.
///
/// The combined chunk is trimmed from the start when it would exceed `chunk_size`.
fn apply_overlap(chunks: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;
    for current in chunks {
        let chunk = match previous.as_deref() {
            Some(previous) => build_overlapped_chunk(previous, &current, overlap, chunk_size),
            None => current.clone(),
        };
        overlapped.push(chunk);
        previous = Some(current);
    }
    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
) -> String {
    let tail = tail_with_char_limit(previous, overlap);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    trim_to_char_budget(&combined, chunk_size)
}

/// Last `limit` characters of `text`, without leading whitespace.
fn tail_with_char_limit(text: &str, limit: usize) -> &str {
    let total = char_count(text);
    if total <= limit {
        return text.trim_start();
    }
    let start = text
        .char_indices()
        .nth(total - limit)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    text[start..].trim_start()
}

/// Drop leading characters until `text` fits in `budget` characters.
fn trim_to_char_budget(text: &str, budget: usize) -> String {
    let total = char_count(text);
    if total <= budget {
        return text.to_string();
    }
    let start = text
        .char_indices()
        .nth(total - budget)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    text[start..].trim_start().to_string()
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars()
        .next_back()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}
