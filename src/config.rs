//! TOML configuration for the `corpuscle` binary.
//!
//! See `config/corpuscle.example.toml` for a full example. All values
//! carry defaults matching the reference deployment (500-word chunks
//! with 50-word overlap, 250/50 prefetch/rescore limits, 384-dim
//! dense model).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use corpuscle_core::chunk::ChunkingConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Connection settings for the external vector index.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Base URL of the Qdrant HTTP API (e.g. `http://localhost:6333`).
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Name of the dense vector field in the collection schema.
    #[serde(default = "default_dense_field")]
    pub dense_field: String,
    /// Name of the sparse vector field in the collection schema.
    #[serde(default = "default_sparse_field")]
    pub sparse_field: String,
    #[serde(default = "default_index_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_collection() -> String {
    "corpus".to_string()
}
fn default_dense_field() -> String {
    "dense".to_string()
}
fn default_sparse_field() -> String {
    "sparse".to_string()
}
fn default_index_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl ChunkingSettings {
    pub fn to_core(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingSettings {
    pub dense: DenseEndpoint,
    pub sparse: SparseEndpoint,
    /// Number of texts per embedding request during ingestion.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

/// Endpoint of the dense embedding inference service.
#[derive(Debug, Deserialize, Clone)]
pub struct DenseEndpoint {
    pub url: String,
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
}

/// Endpoint of the sparse embedding inference service.
#[derive(Debug, Deserialize, Clone)]
pub struct SparseEndpoint {
    pub url: String,
    pub model: String,
}

fn default_batch_size() -> usize {
    32
}
fn default_embed_timeout_secs() -> u64 {
    30
}
fn default_dims() -> usize {
    384
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Stage-1 dense candidate count (K1).
    #[serde(default = "default_prefetch_limit")]
    pub prefetch_limit: usize,
    /// Stage-2 sparse candidate count (K2).
    #[serde(default = "default_rescore_limit")]
    pub rescore_limit: usize,
    /// Default result count when `--limit` is not given.
    #[serde(default = "default_final_limit")]
    pub final_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            prefetch_limit: default_prefetch_limit(),
            rescore_limit: default_rescore_limit(),
            final_limit: default_final_limit(),
        }
    }
}

fn default_prefetch_limit() -> usize {
    250
}
fn default_rescore_limit() -> usize {
    50
}
fn default_final_limit() -> usize {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }

    if config.retrieval.final_limit < 1 {
        anyhow::bail!("retrieval.final_limit must be >= 1");
    }
    if config.retrieval.rescore_limit < config.retrieval.final_limit {
        anyhow::bail!("retrieval.rescore_limit must be >= retrieval.final_limit");
    }
    if config.retrieval.prefetch_limit < config.retrieval.rescore_limit {
        anyhow::bail!("retrieval.prefetch_limit must be >= retrieval.rescore_limit");
    }

    if config.embedding.dense.dims == 0 {
        anyhow::bail!("embedding.dense.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.index.url.trim().is_empty() {
        anyhow::bail!("index.url must not be empty");
    }

    Ok(config)
}
