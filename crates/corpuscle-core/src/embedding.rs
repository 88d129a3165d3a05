//! Embedder traits and vector math.
//!
//! The two embedding models are external, potentially slow services.
//! They sit behind the narrow [`DenseEmbedder`] and [`SparseEmbedder`]
//! traits so the pipelines never touch a concrete backend and tests
//! can substitute deterministic stubs.
//!
//! Concrete HTTP-backed implementations live in the `corpuscle` app
//! crate; this crate only defines the contract and the similarity
//! helpers used by the in-memory index.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Sparse embedding: term index → non-negative weight.
///
/// Matches the Qdrant wire shape: parallel `indices` and `values`
/// arrays with unique indices per vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Self {
        Self { indices, values }
    }

    /// Number of non-zero entries.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// A vector is well formed when indices and values pair up.
    pub fn is_well_formed(&self) -> bool {
        self.indices.len() == self.values.len()
    }
}

/// The two complementary representations computed for one text.
///
/// Both derive from the same source text, computed independently.
#[derive(Debug, Clone)]
pub struct EmbeddingPair {
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
}

/// Dense embedding backend: text → fixed-length real vector, compared
/// by cosine similarity. Must be deterministic for identical input
/// within one deployed model version.
#[async_trait]
pub trait DenseEmbedder: Send + Sync {
    /// Model identifier (e.g. `"snowflake/snowflake-arctic-embed-s"`).
    fn model_name(&self) -> &str;

    /// Output dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let out = self.embed_batch(&[text.to_string()]).await?;
        out.into_iter()
            .next()
            .ok_or_else(|| PipelineError::embedding("empty dense embedding response"))
    }
}

/// Sparse embedding backend: text → term-index/weight mapping,
/// compared by IDF-modified weighted overlap.
#[async_trait]
pub trait SparseEmbedder: Send + Sync {
    /// Model identifier (e.g. `"Qdrant/minicoil-v1"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, one sparse vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<SparseVector>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<SparseVector> {
        let out = self.embed_batch(&[text.to_string()]).await?;
        out.into_iter()
            .next()
            .ok_or_else(|| PipelineError::embedding("empty sparse embedding response"))
    }
}

/// Check a dense batch against the embedder's declared dimensionality.
///
/// A wrong-length vector is a malformed embedder response, surfaced as
/// [`PipelineError::Embedding`] rather than stored.
pub fn validate_dense_batch(vectors: &[Vec<f32>], dims: usize) -> Result<()> {
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dims {
            return Err(PipelineError::embedding(format!(
                "dense vector {} has {} dimensions, expected {}",
                i,
                v.len(),
                dims
            )));
        }
    }
    Ok(())
}

/// Check a sparse batch for paired indices/values.
pub fn validate_sparse_batch(vectors: &[SparseVector]) -> Result<()> {
    for (i, v) in vectors.iter().enumerate() {
        if !v.is_well_formed() {
            return Err(PipelineError::embedding(format!(
                "sparse vector {} has {} indices but {} values",
                i,
                v.indices.len(),
                v.values.len()
            )));
        }
    }
    Ok(())
}

/// Cosine similarity between two dense vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// IDF-modified dot product over shared term indices.
///
/// `idf` maps term index → inverse-document-frequency weight; terms
/// missing from the map contribute nothing.
pub fn sparse_dot(query: &SparseVector, doc: &SparseVector, idf: &HashMap<u32, f32>) -> f32 {
    let doc_weights: HashMap<u32, f32> = doc
        .indices
        .iter()
        .copied()
        .zip(doc.values.iter().copied())
        .collect();

    let mut score = 0.0f32;
    for (&idx, &qv) in query.indices.iter().zip(query.values.iter()) {
        if let Some(&dv) = doc_weights.get(&idx) {
            score += qv * dv * idf.get(&idx).copied().unwrap_or(0.0);
        }
    }
    score
}
