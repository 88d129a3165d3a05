//! # Corpuscle Core
//!
//! Shared logic for the Corpuscle hybrid retrieval pipeline: the
//! sliding-window chunker, embedder traits, Reciprocal Rank Fusion,
//! the vector-index abstraction (with a brute-force in-memory
//! implementation), and the ingestion and query pipelines.
//!
//! This crate contains no runtime, HTTP, or filesystem dependencies;
//! concrete embedding providers and the Qdrant-backed index client
//! live in the `corpuscle` app crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod ingest;
pub mod search;
pub mod store;

pub use error::{PipelineError, Result};
