//! Sliding-window word chunker.
//!
//! Turns a raw corpus into an ordered sequence of overlapping
//! word-windows — the unit of embedding and storage.
//!
//! # Algorithm
//!
//! 1. Normalize: drop blank lines and lines consisting of exactly one
//!    non-alphanumeric character (cheap noise removal for
//!    scanned/converted text), then re-tokenize the survivors on
//!    whitespace into a single word stream.
//! 2. Keep a cursor `start` at 0. While `start` is inside the stream,
//!    emit the window `[start, start + chunk_size)` clipped to the
//!    stream length, then advance by `chunk_size - overlap`.
//!
//! The loop terminates because [`ChunkingConfig::validate`] guarantees
//! a strictly positive step; that precondition is checked at entry,
//! never left as a runtime hazard.
//!
//! # Example
//!
//! ```rust
//! use corpuscle_core::chunk::{chunk_text, ChunkingConfig};
//!
//! let cfg = ChunkingConfig { chunk_size: 3, overlap: 1 };
//! let chunks = chunk_text("Cancer is a disease. Cells grow.", &cfg).unwrap();
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, ["Cancer is a", "a disease. Cells", "Cells grow."]);
//! ```

use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Sliding-window parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Number of words per window.
    pub chunk_size: usize,
    /// Number of words shared between consecutive windows.
    pub overlap: usize,
}

impl ChunkingConfig {
    /// Reject configurations whose window step would be non-positive.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::invalid("chunk_size must be > 0"));
        }
        if self.overlap >= self.chunk_size {
            return Err(PipelineError::invalid(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Window advance per iteration. Positive after [`validate`](Self::validate).
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

/// One overlapping window of the source word stream.
///
/// Immutable once created; discarded after embedding.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    /// Word offset of the window in the normalized stream.
    pub start_index: usize,
    /// 0-based order of creation.
    pub sequence_position: usize,
    /// Space-joined window words.
    pub text: String,
}

/// Normalize raw corpus text into a word stream.
///
/// Lines that are blank or a single non-alphanumeric character are
/// discarded; the rest are joined and split on whitespace.
pub fn tokenize(raw: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for line in raw.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        let mut chars = stripped.chars();
        if let (Some(only), None) = (chars.next(), chars.next()) {
            if !only.is_alphanumeric() {
                continue;
            }
        }
        words.extend(stripped.split_whitespace());
    }
    words
}

/// Split a word stream into overlapping chunks.
///
/// An empty stream yields an empty output. The trailing window may be
/// shorter than `chunk_size` and is still emitted.
pub fn chunk_words(words: &[&str], cfg: &ChunkingConfig) -> Result<Vec<Chunk>> {
    cfg.validate()?;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < words.len() {
        let end = (start + cfg.chunk_size).min(words.len());
        chunks.push(Chunk {
            start_index: start,
            sequence_position: chunks.len(),
            text: words[start..end].join(" "),
        });
        start += cfg.step();
    }
    Ok(chunks)
}

/// Normalize and chunk in one call.
pub fn chunk_text(raw: &str, cfg: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let words = tokenize(raw);
    chunk_words(&words, cfg)
}
