//! Ingestion pipeline.
//!
//! Coordinates the full load flow: normalization → chunking → dense +
//! sparse embedding → collection recreation → one acknowledged batch
//! upsert. Ingestion is destructive: the target collection is dropped
//! and recreated, so re-running fully replaces prior content and never
//! appends or duplicates.
//!
//! Failure semantics: configuration problems are rejected before any
//! work; an embedding failure aborts the whole run before the index is
//! touched; a schema mismatch aborts before any upsert; the upsert
//! itself is all-or-nothing at the batch boundary and the core never
//! retries on behalf of the caller.

use uuid::Uuid;

use crate::chunk::{chunk_text, ChunkingConfig};
use crate::embedding::{
    validate_dense_batch, validate_sparse_batch, DenseEmbedder, EmbeddingPair, SparseEmbedder,
};
use crate::error::{PipelineError, Result};
use crate::store::{
    CollectionSchema, DenseVectorSchema, Distance, SparseModifier, SparseVectorSchema,
    StoredPoint, VectorIndex,
};

/// Settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Target collection name.
    pub collection: String,
    /// Sliding-window parameters.
    pub chunking: ChunkingConfig,
    /// Number of chunk texts per embedding call.
    pub batch_size: usize,
    /// Name of the dense vector field in the collection schema.
    pub dense_field: String,
    /// Name of the sparse vector field in the collection schema.
    pub sparse_field: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            collection: "corpus".to_string(),
            chunking: ChunkingConfig::default(),
            batch_size: 32,
            dense_field: "dense".to_string(),
            sparse_field: "sparse".to_string(),
        }
    }
}

impl IngestOptions {
    fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.batch_size == 0 {
            return Err(PipelineError::invalid("batch_size must be > 0"));
        }
        Ok(())
    }

    /// The dual-vector schema this run asserts on the collection.
    pub fn schema(&self, dense_dims: usize) -> CollectionSchema {
        CollectionSchema {
            dense: DenseVectorSchema {
                name: self.dense_field.clone(),
                dims: dense_dims,
                distance: Distance::Cosine,
            },
            sparse: SparseVectorSchema {
                name: self.sparse_field.clone(),
                modifier: SparseModifier::Idf,
            },
        }
    }
}

/// Embed texts with both models in lockstep batches, yielding one
/// [`EmbeddingPair`] per input text in input order.
///
/// A count mismatch or malformed vector from either backend aborts
/// with [`PipelineError::Embedding`]; nothing is silently skipped,
/// since a skip would break text-to-pair correspondence.
pub async fn embed_pairs(
    texts: &[String],
    dense: &dyn DenseEmbedder,
    sparse: &dyn SparseEmbedder,
    batch_size: usize,
) -> Result<Vec<EmbeddingPair>> {
    if batch_size == 0 {
        return Err(PipelineError::invalid("batch_size must be > 0"));
    }

    let mut pairs = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size) {
        let dense_batch = dense.embed_batch(batch).await?;
        if dense_batch.len() != batch.len() {
            return Err(PipelineError::embedding(format!(
                "dense embedder returned {} vectors for {} texts",
                dense_batch.len(),
                batch.len()
            )));
        }
        validate_dense_batch(&dense_batch, dense.dims())?;

        let sparse_batch = sparse.embed_batch(batch).await?;
        if sparse_batch.len() != batch.len() {
            return Err(PipelineError::embedding(format!(
                "sparse embedder returned {} vectors for {} texts",
                sparse_batch.len(),
                batch.len()
            )));
        }
        validate_sparse_batch(&sparse_batch)?;

        pairs.extend(
            dense_batch
                .into_iter()
                .zip(sparse_batch)
                .map(|(dense, sparse)| EmbeddingPair { dense, sparse }),
        );
    }
    Ok(pairs)
}

/// Chunk, embed, and bulk-load a corpus into the index.
///
/// Returns the number of points written. An empty corpus still
/// recreates the collection and returns zero without issuing an
/// upsert.
pub async fn ingest(
    corpus_text: &str,
    dense: &dyn DenseEmbedder,
    sparse: &dyn SparseEmbedder,
    index: &dyn VectorIndex,
    opts: &IngestOptions,
) -> Result<usize> {
    opts.validate()?;

    let chunks = chunk_text(corpus_text, &opts.chunking)?;
    tracing::info!(
        collection = %opts.collection,
        chunks = chunks.len(),
        "chunked corpus"
    );

    // Embed everything before touching the index, so an embedding
    // failure leaves the previous collection intact.
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let pairs = embed_pairs(&texts, dense, sparse, opts.batch_size).await?;

    let schema = opts.schema(dense.dims());
    index.recreate_collection(&opts.collection, &schema).await?;

    // The recreated collection must expose exactly the asserted schema.
    match index.schema(&opts.collection).await? {
        Some(actual) if schema.matches(&actual) => {}
        Some(actual) => {
            return Err(PipelineError::SchemaMismatch(format!(
                "collection '{}' reports {:?}, expected {:?}",
                opts.collection, actual, schema
            )));
        }
        None => {
            return Err(PipelineError::SchemaMismatch(format!(
                "collection '{}' missing after recreation",
                opts.collection
            )));
        }
    }

    if chunks.is_empty() {
        tracing::info!(collection = %opts.collection, "empty corpus, nothing to upsert");
        return Ok(0);
    }

    let points: Vec<StoredPoint> = chunks
        .into_iter()
        .zip(pairs)
        .map(|(chunk, pair)| StoredPoint {
            id: Uuid::new_v4(),
            dense: pair.dense,
            sparse: pair.sparse,
            payload: chunk.text,
        })
        .collect();

    let written = points.len();
    index.upsert(&opts.collection, points, true).await?;
    tracing::info!(collection = %opts.collection, points = written, "upsert acknowledged");

    Ok(written)
}
