//! The `search` command: query text → hybrid retrieval → ranked payloads.

use anyhow::Result;

use corpuscle_core::search::{search, SearchOptions};

use crate::config::Config;
use crate::embedding::{HttpDenseEmbedder, HttpSparseEmbedder};
use crate::qdrant::QdrantIndex;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let dense = HttpDenseEmbedder::new(&config.embedding)?;
    let sparse = HttpSparseEmbedder::new(&config.embedding)?;
    let index = QdrantIndex::new(&config.index)?;

    let options = SearchOptions {
        collection: config.index.collection.clone(),
        prefetch_limit: config.retrieval.prefetch_limit,
        rescore_limit: config.retrieval.rescore_limit,
    };
    let result_count = limit.unwrap_or(config.retrieval.final_limit);

    let results = search(query, result_count, &dense, &sparse, &index, &options).await?;
    tracing::debug!(results = results.len(), "hybrid query completed");

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.4}] {}", i + 1, result.score, result.payload);
    }
    Ok(())
}
