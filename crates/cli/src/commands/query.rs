use anyhow::Result;
use citeblock_core::ReviewId;
use citeblock_storage::{DedupeIndexStore, StorageBackend};

pub(crate) async fn run_pairs(
    storage: &StorageBackend,
    review_id: ReviewId,
    blocks: bool,
) -> Result<()> {
    if blocks {
        let blocks = storage.get_candidate_blocks(review_id).await?;
        println!("{}", serde_json::to_string_pretty(&blocks)?);
    } else {
        let pairs = storage.get_candidate_pairs(review_id).await?;
        println!("{}", serde_json::to_string_pretty(&pairs)?);
    }
    Ok(())
}

pub(crate) async fn run_stats(storage: &StorageBackend, review_id: ReviewId) -> Result<()> {
    let stats = storage.get_index_stats(review_id).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
