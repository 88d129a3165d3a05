//! # Corpuscle
//!
//! A hybrid dense + sparse retrieval pipeline over a single text
//! corpus. The crate splits a corpus into overlapping word windows,
//! embeds every chunk with a dense model and a sparse model, stores
//! both vectors per point in a Qdrant collection, and answers queries
//! with a two-stage search: a wide dense prefetch, a sparse re-score
//! within the candidates, and Reciprocal Rank Fusion of the two
//! rankings.
//!
//! The pipeline core (chunking, embedding traits, fusion, the
//! `VectorIndex` abstraction, ingestion, and query orchestration)
//! lives in the `corpuscle-core` crate and has no HTTP or runtime
//! dependencies. This crate supplies the wiring: TOML configuration,
//! reqwest-backed embedding providers, the Qdrant REST client, and
//! the CLI.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod ingest;
pub mod qdrant;
pub mod search;
