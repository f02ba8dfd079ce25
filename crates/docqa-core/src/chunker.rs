//! Splits extracted document text into overlapping chunks.
//!
//! Sizes are byte counts, always snapped to UTF-8 char boundaries. A chunk
//! ends at the last paragraph break inside its window, else the last sentence
//! end, else the last line break, else the last whitespace, else a hard cut.
//! Chunk `n+1` starts `overlap` bytes before chunk `n` ends, and
//! `chunk.overlap` records how many leading bytes were repeated, so
//! concatenating every chunk's `fresh_text()` yields the original text.

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, Domain};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 200 }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(s: &ChunkingSettings) -> Self {
        Self { chunk_size: s.chunk_size, overlap: s.chunk_overlap }
    }
}

/// Byte span of one chunk; `overlap` bytes at its head repeat the previous chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        if config.overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn chunk(&self, document_id: &str, domain: Domain, uploaded_at: i64, text: &str) -> Vec<Chunk> {
        self.spans(text)
            .into_iter()
            .enumerate()
            .map(|(index, span)| Chunk {
                id: Chunk::make_id(document_id, index),
                document_id: document_id.to_string(),
                index,
                start: span.start,
                end: span.end,
                overlap: span.overlap,
                text: text[span.start..span.end].to_string(),
                domain,
                uploaded_at,
            })
            .collect()
    }

    pub fn spans(&self, text: &str) -> Vec<Span> {
        let len = text.len();
        let ChunkingConfig { chunk_size, overlap } = self.config;
        let min_fill = (chunk_size / 2).max(overlap + 1);

        let mut spans: Vec<Span> = Vec::new();
        let mut start = 0;
        let mut prev_end = 0;
        while start < len {
            let end = if start + chunk_size >= len {
                len
            } else {
                let hard_end = floor_boundary(text, start + chunk_size);
                if hard_end <= start {
                    // a single char wider than the window
                    ceil_boundary(text, start + 1)
                } else {
                    let lo = ceil_boundary(text, start + min_fill).min(hard_end);
                    soft_end(text, lo, hard_end).unwrap_or(hard_end)
                }
            };
            // every chunk must contribute fresh text
            let end = end.max(ceil_boundary(text, prev_end + 1));
            spans.push(Span { start, end, overlap: prev_end.saturating_sub(start) });
            if end >= len {
                break;
            }
            let mut next = ceil_boundary(text, end.saturating_sub(overlap));
            if next <= start {
                next = end;
            }
            prev_end = end;
            start = next;
        }
        spans
    }
}

/// Best break in `text[lo..hi]`, as the offset just past the separator.
fn soft_end(text: &str, lo: usize, hi: usize) -> Option<usize> {
    if lo >= hi {
        return None;
    }
    let window = &text[lo..hi];

    if let Some(pos) = window.rfind("\n\n") {
        return Some(lo + pos + 2);
    }

    let mut sentence_end = None;
    let mut prev: Option<char> = None;
    for (i, c) in window.char_indices() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            sentence_end = Some(lo + i + c.len_utf8());
        }
        prev = Some(c);
    }
    if sentence_end.is_some() {
        return sentence_end;
    }

    if let Some(pos) = window.rfind('\n') {
        return Some(lo + pos + 1);
    }
    window
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .last()
        .map(|(i, c)| lo + i + c.len_utf8())
}

fn floor_boundary(text: &str, i: usize) -> usize {
    let mut i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, i: usize) -> usize {
    let mut i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
