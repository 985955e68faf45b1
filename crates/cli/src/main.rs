use anyhow::{Context, Result};
use citeblock_core::ReviewId;
use citeblock_core::env_config::env_string;
use citeblock_storage::StorageBackend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "citeblock")]
#[command(about = "Blocking index and candidate pairs for citation deduplication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the block index of one review
    Run {
        review_id: i32,
        /// Trained blocking model (overrides CITEBLOCK_MODEL_PATH)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
    /// Run every review that has unresolved citations
    Sweep {
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
    /// Print candidate pairs of a review
    Pairs {
        review_id: i32,
        /// Print whole candidate blocks instead of pairs
        #[arg(long)]
        blocks: bool,
    },
    /// Print row counts of a review's block index
    Stats { review_id: i32 },
    /// Load citations from a JSON array file into a review
    Import { review_id: i32, file: PathBuf },
}

async fn open_storage() -> Result<StorageBackend> {
    let url = env_string("DATABASE_URL").context("DATABASE_URL must be set")?;
    Ok(StorageBackend::new_postgres(&url).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = open_storage().await?;
    tracing::debug!(backend = storage.kind(), "storage ready");

    match cli.command {
        Commands::Run { review_id, model } => {
            commands::dedup::run_one(storage, ReviewId(review_id), model).await
        },
        Commands::Sweep { model } => commands::dedup::run_sweep(storage, model).await,
        Commands::Pairs { review_id, blocks } => {
            commands::query::run_pairs(&storage, ReviewId(review_id), blocks).await
        },
        Commands::Stats { review_id } => {
            commands::query::run_stats(&storage, ReviewId(review_id)).await
        },
        Commands::Import { review_id, file } => {
            commands::import::run_import(&storage, ReviewId(review_id), &file).await
        },
    }
}
