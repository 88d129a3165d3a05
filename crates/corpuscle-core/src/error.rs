//! Error taxonomy for the retrieval pipeline.
//!
//! Every failure the core can produce falls into one of four buckets:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`PipelineError::InvalidConfiguration`] | Rejected before any work begins |
//! | [`PipelineError::Embedding`] | An embedding call failed or returned a malformed vector |
//! | [`PipelineError::SchemaMismatch`] | The index collection does not match the dual-vector schema |
//! | [`PipelineError::IndexUnavailable`] | The index could not be reached; `retryable` tells the caller whether retrying makes sense |
//!
//! The core itself never retries and never partially commits; retry
//! policy belongs to the caller.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// All errors surfaced by the chunking, ingestion, and query pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A parameter combination that can never produce useful work,
    /// e.g. a non-positive chunking step or `result_count == 0`.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An embedding call failed or produced a malformed vector.
    ///
    /// Fatal for the affected chunk or query; never silently skipped,
    /// since skipping would corrupt chunk-to-point correspondence.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The index collection does not match the expected dual-vector
    /// schema. Ingestion aborts before any upsert.
    #[error("collection schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The external index could not be reached or timed out.
    #[error("index unavailable: {message}")]
    IndexUnavailable {
        message: String,
        /// Whether the caller may reasonably retry (timeouts, 5xx).
        retryable: bool,
    },
}

impl PipelineError {
    /// Shorthand for [`PipelineError::InvalidConfiguration`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Shorthand for [`PipelineError::Embedding`].
    pub fn embedding(msg: impl std::fmt::Display) -> Self {
        Self::Embedding(msg.to_string())
    }

    /// Build a retryable [`PipelineError::IndexUnavailable`].
    pub fn index_retryable(msg: impl std::fmt::Display) -> Self {
        Self::IndexUnavailable {
            message: msg.to_string(),
            retryable: true,
        }
    }

    /// Build a non-retryable [`PipelineError::IndexUnavailable`].
    pub fn index_fatal(msg: impl std::fmt::Display) -> Self {
        Self::IndexUnavailable {
            message: msg.to_string(),
            retryable: false,
        }
    }
}
