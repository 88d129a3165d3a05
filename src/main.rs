//! # Corpuscle CLI
//!
//! The `corpuscle` binary drives the retrieval pipeline: ingest a
//! corpus file into the vector index, then run hybrid searches
//! against it.
//!
//! ## Usage
//!
//! ```bash
//! # Chunk, embed, and (re)build the collection from a corpus file
//! corpuscle --config ./config/corpuscle.toml ingest ./corpus.txt
//!
//! # Preview chunk counts without touching the index
//! corpuscle ingest ./corpus.txt --dry-run
//!
//! # Query the collection
//! corpuscle search "How do tumors spread?" --limit 5
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Corpuscle — hybrid dense + sparse retrieval over a text corpus.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/corpuscle.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "corpuscle",
    about = "Hybrid dense + sparse retrieval over a text corpus",
    version,
    long_about = "Corpuscle splits a text corpus into overlapping word windows, embeds each \
    chunk with a dense and a sparse model, and indexes both vectors in Qdrant. Queries run a \
    two-stage search: dense prefetch, sparse re-score, and Reciprocal Rank Fusion."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/corpuscle.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a corpus file into the vector index.
    ///
    /// Reads the file, chunks it into overlapping word windows, embeds
    /// every chunk with both models, then drops and recreates the
    /// collection before writing the points. Re-running replaces the
    /// collection contents entirely.
    Ingest {
        /// Path to the corpus text file.
        corpus: PathBuf,

        /// Show word and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search the indexed corpus.
    ///
    /// Embeds the query with both models and runs the two-stage hybrid
    /// search, printing ranked chunk texts with their fusion scores.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return (defaults to
        /// `retrieval.final_limit` from config).
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = corpuscle::config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { corpus, dry_run } => {
            corpuscle::ingest::run_ingest(&cfg, &corpus, dry_run).await?;
        }
        Commands::Search { query, limit } => {
            corpuscle::search::run_search(&cfg, &query, limit).await?;
        }
    }

    Ok(())
}
