use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use citeblock_core::ReviewId;
use citeblock_service::{DedupConfig, DedupService, RunStatus};
use citeblock_storage::StorageBackend;
use tokio_util::sync::CancellationToken;

fn service(storage: StorageBackend, model: Option<PathBuf>) -> DedupService<StorageBackend> {
    let config = DedupConfig::from_env();
    let config = match model {
        Some(path) => config.with_model_path(path),
        None => config,
    };
    DedupService::new(Arc::new(storage), config)
}

/// Token cancelled on Ctrl-C, so a long readiness wait can be interrupted.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping at the next stage boundary");
            trigger.cancel();
        }
    });
    token
}

pub(crate) async fn run_one(
    storage: StorageBackend,
    review_id: ReviewId,
    model: Option<PathBuf>,
) -> Result<()> {
    let service = service(storage, model);
    let result = service.run_dedup_with(review_id, &cancel_on_ctrl_c()).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.status != RunStatus::Done {
        bail!("dedup run for review {review_id} ended as {:?}", result.status);
    }
    Ok(())
}

pub(crate) async fn run_sweep(storage: StorageBackend, model: Option<PathBuf>) -> Result<()> {
    let service = service(storage, model);
    let results = service.run_eligible(&cancel_on_ctrl_c()).await?;
    let report: Vec<_> = results
        .iter()
        .map(|(review_id, result)| serde_json::json!({ "review_id": review_id, "result": result }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    let failed = results.iter().filter(|(_, r)| r.status == RunStatus::Failed).count();
    if failed > 0 {
        bail!("{failed} of {} dedup runs failed", results.len());
    }
    Ok(())
}
