//! End-to-end pipeline tests against the in-memory index.
//!
//! The stub embedders assign one vocabulary slot per distinct
//! lowercased token, so two texts score against each other exactly
//! when they share words — deterministic, collision-free toy
//! semantics.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use corpuscle_core::chunk::ChunkingConfig;
use corpuscle_core::embedding::{DenseEmbedder, SparseEmbedder, SparseVector};
use corpuscle_core::error::{PipelineError, Result};
use corpuscle_core::ingest::{embed_pairs, ingest, IngestOptions};
use corpuscle_core::search::{search, SearchOptions};
use corpuscle_core::store::memory::InMemoryIndex;
use corpuscle_core::store::{CollectionSchema, VectorIndex};

const DIMS: usize = 32;

/// Shared token → slot assignment, handed out in first-seen order.
#[derive(Default)]
struct Vocab {
    slots: Mutex<HashMap<String, usize>>,
}

impl Vocab {
    fn slot(&self, token: &str) -> usize {
        let mut slots = self.slots.lock().unwrap();
        let next = slots.len();
        *slots.entry(token.to_lowercase()).or_insert(next)
    }
}

struct ToyDense {
    vocab: Vocab,
}

impl ToyDense {
    fn new() -> Self {
        Self {
            vocab: Vocab::default(),
        }
    }
}

#[async_trait]
impl DenseEmbedder for ToyDense {
    fn model_name(&self) -> &str {
        "toy-dense"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMS];
                for token in text.split_whitespace() {
                    v[self.vocab.slot(token) % DIMS] += 1.0;
                }
                v
            })
            .collect())
    }
}

struct ToySparse {
    vocab: Vocab,
}

impl ToySparse {
    fn new() -> Self {
        Self {
            vocab: Vocab::default(),
        }
    }
}

#[async_trait]
impl SparseEmbedder for ToySparse {
    fn model_name(&self) -> &str {
        "toy-sparse"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut weights: HashMap<u32, f32> = HashMap::new();
                for token in text.split_whitespace() {
                    *weights.entry(self.vocab.slot(token) as u32).or_insert(0.0) += 1.0;
                }
                let mut entries: Vec<(u32, f32)> = weights.into_iter().collect();
                entries.sort_by_key(|(idx, _)| *idx);
                let (indices, values) = entries.into_iter().unzip();
                SparseVector::new(indices, values)
            })
            .collect())
    }
}

/// Embedder that always fails, for propagation tests.
struct BrokenDense;

#[async_trait]
impl DenseEmbedder for BrokenDense {
    fn model_name(&self) -> &str {
        "broken"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(PipelineError::embedding("model backend offline"))
    }
}

/// Index wrapper whose schema readback never matches what was created.
struct LyingIndex {
    inner: InMemoryIndex,
}

#[async_trait]
impl VectorIndex for LyingIndex {
    async fn recreate_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        self.inner.recreate_collection(name, schema).await
    }

    async fn schema(&self, name: &str) -> Result<Option<CollectionSchema>> {
        Ok(self.inner.schema(name).await?.map(|mut s| {
            s.dense.dims += 1;
            s
        }))
    }

    async fn upsert(
        &self,
        name: &str,
        points: Vec<corpuscle_core::store::StoredPoint>,
        wait: bool,
    ) -> Result<()> {
        self.inner.upsert(name, points, wait).await
    }

    async fn query(
        &self,
        name: &str,
        query: &corpuscle_core::store::HybridQuery,
    ) -> Result<Vec<corpuscle_core::store::ScoredPayload>> {
        self.inner.query(name, query).await
    }

    async fn count(&self, name: &str) -> Result<usize> {
        self.inner.count(name).await
    }
}

const CORPUS: &str = "Cancer is a disease. Cells grow.";

fn small_opts() -> IngestOptions {
    IngestOptions {
        chunking: ChunkingConfig {
            chunk_size: 3,
            overlap: 1,
        },
        ..IngestOptions::default()
    }
}

#[tokio::test]
async fn test_embed_pairs_keeps_input_order_across_batches() {
    let dense = ToyDense::new();
    let sparse = ToySparse::new();
    let texts: Vec<String> = ["cancer", "cells", "disease"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    // Batch smaller than the input forces multiple round trips.
    let pairs = embed_pairs(&texts, &dense, &sparse, 2).await.unwrap();

    assert_eq!(pairs.len(), texts.len());
    for (text, pair) in texts.iter().zip(&pairs) {
        assert_eq!(pair.dense.len(), DIMS);
        assert!(pair.sparse.is_well_formed());
        // Both representations of one text light up the same slot.
        let slot = pair.sparse.indices[0] as usize;
        assert_eq!(pair.dense[slot], 1.0, "misaligned pair for {text:?}");
    }
}

#[tokio::test]
async fn test_embed_pairs_rejects_zero_batch_size() {
    let err = embed_pairs(&["a".to_string()], &ToyDense::new(), &ToySparse::new(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_ingest_writes_one_point_per_chunk() {
    let index = InMemoryIndex::new();
    let written = ingest(CORPUS, &ToyDense::new(), &ToySparse::new(), &index, &small_opts())
        .await
        .unwrap();
    assert_eq!(written, 3);
    assert_eq!(index.count("corpus").await.unwrap(), 3);
}

#[tokio::test]
async fn test_reingest_replaces_instead_of_appending() {
    let index = InMemoryIndex::new();
    let opts = small_opts();
    let dense = ToyDense::new();
    let sparse = ToySparse::new();

    let first = ingest(CORPUS, &dense, &sparse, &index, &opts).await.unwrap();
    let second = ingest(CORPUS, &dense, &sparse, &index, &opts).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(index.count("corpus").await.unwrap(), first);
}

#[tokio::test]
async fn test_query_returns_chunk_containing_cancer() {
    let index = InMemoryIndex::new();
    let dense = ToyDense::new();
    let sparse = ToySparse::new();
    ingest(CORPUS, &dense, &sparse, &index, &small_opts())
        .await
        .unwrap();

    let results = search(
        "cancer",
        1,
        &dense,
        &sparse,
        &index,
        &SearchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].payload.contains("Cancer"));
}

#[tokio::test]
async fn test_search_empty_collection_is_empty_not_error() {
    let index = InMemoryIndex::new();
    let results = search(
        "anything",
        3,
        &ToyDense::new(),
        &ToySparse::new(),
        &index,
        &SearchOptions::default(),
    )
    .await
    .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_blank_query_is_empty() {
    let index = InMemoryIndex::new();
    let results = search(
        "   ",
        3,
        &ToyDense::new(),
        &ToySparse::new(),
        &index,
        &SearchOptions::default(),
    )
    .await
    .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_zero_result_count_rejected() {
    let index = InMemoryIndex::new();
    let err = search(
        "cancer",
        0,
        &ToyDense::new(),
        &ToySparse::new(),
        &index,
        &SearchOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_stage_limits_must_nest() {
    let index = InMemoryIndex::new();
    let opts = SearchOptions {
        prefetch_limit: 10,
        rescore_limit: 50,
        ..SearchOptions::default()
    };
    let err = search(
        "cancer",
        1,
        &ToyDense::new(),
        &ToySparse::new(),
        &index,
        &opts,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_embedding_failure_propagates_and_preserves_index() {
    let index = InMemoryIndex::new();
    let dense = ToyDense::new();
    let sparse = ToySparse::new();
    let opts = small_opts();

    ingest(CORPUS, &dense, &sparse, &index, &opts).await.unwrap();
    let before = index.count("corpus").await.unwrap();

    let err = ingest(CORPUS, &BrokenDense, &sparse, &index, &opts)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Embedding(_)));

    // Embedding happens before the destructive recreate, so the old
    // collection is untouched.
    assert_eq!(index.count("corpus").await.unwrap(), before);
}

#[tokio::test]
async fn test_schema_mismatch_aborts_before_upsert() {
    let index = LyingIndex {
        inner: InMemoryIndex::new(),
    };
    let err = ingest(CORPUS, &ToyDense::new(), &ToySparse::new(), &index, &small_opts())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    assert_eq!(index.count("corpus").await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_chunking_rejected_before_any_work() {
    let index = InMemoryIndex::new();
    let opts = IngestOptions {
        chunking: ChunkingConfig {
            chunk_size: 5,
            overlap: 5,
        },
        ..IngestOptions::default()
    };
    let err = ingest(CORPUS, &ToyDense::new(), &ToySparse::new(), &index, &opts)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    // No collection was created.
    assert!(index.schema("corpus").await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_corpus_recreates_collection_with_zero_points() {
    let index = InMemoryIndex::new();
    let written = ingest("", &ToyDense::new(), &ToySparse::new(), &index, &small_opts())
        .await
        .unwrap();
    assert_eq!(written, 0);
    assert!(index.schema("corpus").await.unwrap().is_some());
    assert_eq!(index.count("corpus").await.unwrap(), 0);
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let index = InMemoryIndex::new();
    let dense = ToyDense::new();
    let sparse = ToySparse::new();
    ingest(CORPUS, &dense, &sparse, &index, &small_opts())
        .await
        .unwrap();

    let opts = SearchOptions::default();
    let a = search("cells grow", 3, &dense, &sparse, &index, &opts)
        .await
        .unwrap();
    let b = search("cells grow", 3, &dense, &sparse, &index, &opts)
        .await
        .unwrap();

    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.payload, y.payload);
        assert!((x.score - y.score).abs() < 1e-12);
    }
}
