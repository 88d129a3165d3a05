//! The `ingest` command: corpus file → chunks → embeddings → index.

use std::path::Path;

use anyhow::Result;

use corpuscle_core::chunk::{chunk_words, tokenize};
use corpuscle_core::ingest::{ingest, IngestOptions};

use crate::config::Config;
use crate::corpus::read_corpus;
use crate::embedding::{HttpDenseEmbedder, HttpSparseEmbedder};
use crate::qdrant::QdrantIndex;

pub async fn run_ingest(config: &Config, corpus_path: &Path, dry_run: bool) -> Result<()> {
    let text = read_corpus(corpus_path)?;

    if dry_run {
        let words = tokenize(&text);
        let chunks = chunk_words(&words, &config.chunking.to_core())?;
        println!("ingest {} (dry-run)", corpus_path.display());
        println!("  words: {}", words.len());
        println!("  chunks: {}", chunks.len());
        return Ok(());
    }

    let dense = HttpDenseEmbedder::new(&config.embedding)?;
    let sparse = HttpSparseEmbedder::new(&config.embedding)?;
    let index = QdrantIndex::new(&config.index)?;

    let options = IngestOptions {
        collection: config.index.collection.clone(),
        chunking: config.chunking.to_core(),
        batch_size: config.embedding.batch_size,
        dense_field: config.index.dense_field.clone(),
        sparse_field: config.index.sparse_field.clone(),
    };

    tracing::info!(
        corpus = %corpus_path.display(),
        collection = %config.index.collection,
        "starting ingestion"
    );
    let written = ingest(&text, &dense, &sparse, &index, &options).await?;

    println!("ingest {}", corpus_path.display());
    println!("  collection: {}", config.index.collection);
    println!("  points written: {}", written);
    println!("ok");
    Ok(())
}
