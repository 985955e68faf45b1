use std::path::Path;

use anyhow::{Context, Result};
use citeblock_core::{NewCitation, ReviewId};
use citeblock_storage::{CitationStore, StorageBackend};

pub(crate) async fn run_import(
    storage: &StorageBackend,
    review_id: ReviewId,
    file: &Path,
) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let citations: Vec<NewCitation> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of citations", file.display()))?;
    let ids = storage.insert_citations(review_id, &citations).await?;
    tracing::info!(review_id = %review_id, imported = ids.len(), "citations imported");
    println!("{}", serde_json::to_string_pretty(&ids)?);
    Ok(())
}
