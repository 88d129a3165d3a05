//! Corpus file loading.

use anyhow::{Context, Result};
use std::path::Path;

/// Read the corpus file as UTF-8, substituting invalid byte sequences
/// with U+FFFD rather than failing the whole ingestion.
pub fn read_corpus(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
