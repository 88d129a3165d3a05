//! Vector-index abstraction.
//!
//! The [`VectorIndex`] trait defines the operations the ingestion and
//! query pipelines need from the external index service, enabling
//! pluggable backends (Qdrant over HTTP in the app crate, the
//! brute-force [`memory::InMemoryIndex`] for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embedding::SparseVector;
use crate::error::{PipelineError, Result};

/// Distance metric for the dense vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
}

/// Scoring-time weight modifier for the sparse vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SparseModifier {
    Idf,
}

/// Schema of the named dense vector field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseVectorSchema {
    pub name: String,
    pub dims: usize,
    pub distance: Distance,
}

/// Schema of the named sparse vector field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseVectorSchema {
    pub name: String,
    pub modifier: SparseModifier,
}

/// The exact dual-vector collection schema asserted at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub dense: DenseVectorSchema,
    pub sparse: SparseVectorSchema,
}

impl CollectionSchema {
    /// Field-by-field comparison used for schema validation.
    pub fn matches(&self, other: &CollectionSchema) -> bool {
        self == other
    }
}

/// Persisted unit in the index: identifier, both vectors, and the
/// original chunk text as payload. Never mutated; removed only by
/// full collection recreation.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: Uuid,
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub payload: String,
}

/// One two-stage fusion query: dense prefetch, sparse re-score, RRF.
#[derive(Debug, Clone)]
pub struct HybridQuery {
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    /// Stage-1 candidate count (K1).
    pub prefetch_limit: usize,
    /// Stage-2 candidate count (K2).
    pub rescore_limit: usize,
    /// Final result count.
    pub limit: usize,
}

impl HybridQuery {
    /// Enforce `prefetch_limit >= rescore_limit >= limit >= 1`.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(PipelineError::invalid("result limit must be >= 1"));
        }
        if self.rescore_limit < self.limit {
            return Err(PipelineError::invalid(format!(
                "rescore_limit ({}) must be >= limit ({})",
                self.rescore_limit, self.limit
            )));
        }
        if self.prefetch_limit < self.rescore_limit {
            return Err(PipelineError::invalid(format!(
                "prefetch_limit ({}) must be >= rescore_limit ({})",
                self.prefetch_limit, self.rescore_limit
            )));
        }
        Ok(())
    }
}

/// One ranked query result: the chunk text and its fused score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPayload {
    pub payload: String,
    pub score: f64,
}

/// Abstract vector-index backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`recreate_collection`](VectorIndex::recreate_collection) | Drop and create a collection with the dual-vector schema |
/// | [`schema`](VectorIndex::schema) | Read back a collection's schema, `None` if absent |
/// | [`upsert`](VectorIndex::upsert) | Write points; `wait` blocks until the index acknowledges durability |
/// | [`query`](VectorIndex::query) | Execute a two-stage fusion query |
/// | [`count`](VectorIndex::count) | Number of points in a collection |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Drop the collection if it exists, then create it with `schema`.
    async fn recreate_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()>;

    /// Read back the collection schema; `None` for a missing collection.
    async fn schema(&self, name: &str) -> Result<Option<CollectionSchema>>;

    /// Upsert points in one batch. With `wait` the call blocks until
    /// the index confirms durability.
    async fn upsert(&self, name: &str, points: Vec<StoredPoint>, wait: bool) -> Result<()>;

    /// Execute a two-stage fusion query. A missing or empty collection
    /// yields an empty result, not an error.
    async fn query(&self, name: &str, query: &HybridQuery) -> Result<Vec<ScoredPayload>>;

    /// Number of points currently stored. Zero for a missing collection.
    async fn count(&self, name: &str) -> Result<usize>;
}
