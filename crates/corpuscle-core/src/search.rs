//! Hybrid query pipeline.
//!
//! One query is a short-lived, stateless request: embed the query text
//! with both embedders, then issue a single two-stage fusion query
//! against the index — coarse dense prefetch (K1), sparse re-score
//! inside the prefetched set (K2), Reciprocal Rank Fusion, truncate.
//! The pipeline never mutates index state, and its output is
//! deterministic given identical embedder outputs and index contents.

use crate::embedding::{DenseEmbedder, SparseEmbedder};
use crate::error::{PipelineError, Result};
use crate::store::{HybridQuery, ScoredPayload, VectorIndex};

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Collection to query.
    pub collection: String,
    /// Stage-1 dense candidate count (K1).
    pub prefetch_limit: usize,
    /// Stage-2 sparse candidate count (K2).
    pub rescore_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            collection: "corpus".to_string(),
            prefetch_limit: 250,
            rescore_limit: 50,
        }
    }
}

/// Run a hybrid search and return fused, ranked chunk payloads.
///
/// A blank query or a missing/empty collection yields an empty result.
/// `result_count` and the stage limits must satisfy
/// `prefetch_limit >= rescore_limit >= result_count >= 1`; anything
/// else is rejected before any work begins.
pub async fn search(
    query_text: &str,
    result_count: usize,
    dense: &dyn DenseEmbedder,
    sparse: &dyn SparseEmbedder,
    index: &dyn VectorIndex,
    opts: &SearchOptions,
) -> Result<Vec<ScoredPayload>> {
    if result_count == 0 {
        return Err(PipelineError::invalid("result_count must be >= 1"));
    }
    if opts.rescore_limit < result_count {
        return Err(PipelineError::invalid(format!(
            "rescore_limit ({}) must be >= result_count ({})",
            opts.rescore_limit, result_count
        )));
    }
    if opts.prefetch_limit < opts.rescore_limit {
        return Err(PipelineError::invalid(format!(
            "prefetch_limit ({}) must be >= rescore_limit ({})",
            opts.prefetch_limit, opts.rescore_limit
        )));
    }

    if query_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let dense_q = dense.embed(query_text).await?;
    if dense_q.len() != dense.dims() {
        return Err(PipelineError::embedding(format!(
            "query dense vector has {} dimensions, expected {}",
            dense_q.len(),
            dense.dims()
        )));
    }
    let sparse_q = sparse.embed(query_text).await?;
    if !sparse_q.is_well_formed() {
        return Err(PipelineError::embedding(
            "query sparse vector has unpaired indices and values",
        ));
    }

    let query = HybridQuery {
        dense: dense_q,
        sparse: sparse_q,
        prefetch_limit: opts.prefetch_limit,
        rescore_limit: opts.rescore_limit,
        limit: result_count,
    };

    tracing::debug!(
        collection = %opts.collection,
        prefetch = opts.prefetch_limit,
        rescore = opts.rescore_limit,
        limit = result_count,
        "issuing hybrid query"
    );
    index.query(&opts.collection, &query).await
}
