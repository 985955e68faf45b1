use citeblock_core::ReviewId;
use citeblock_storage::{CitationStore, DedupeIndexStore};
use tokio_util::sync::CancellationToken;

use super::{DedupService, RunResult, RunStatus};
use crate::ServiceError;

impl<S> DedupService<S>
where
    S: CitationStore + DedupeIndexStore + 'static,
{
    /// Run every review that still has unresolved records, one after another.
    ///
    /// Reviews already being run elsewhere in this process are skipped and
    /// reported as `AlreadyRunning`. Stops early once `cancel` fires.
    pub async fn run_eligible(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<(ReviewId, RunResult)>, ServiceError> {
        let review_ids = self.storage.eligible_review_ids().await?;
        tracing::info!(reviews = review_ids.len(), "dedup sweep started");

        let mut results = Vec::with_capacity(review_ids.len());
        for review_id in review_ids {
            if cancel.is_cancelled() {
                tracing::info!(done = results.len(), "dedup sweep cancelled");
                break;
            }
            let result = self.run_dedup_with(review_id, cancel).await;
            results.push((review_id, result));
        }

        let failed = results.iter().filter(|(_, r)| r.status == RunStatus::Failed).count();
        tracing::info!(runs = results.len(), failed, "dedup sweep finished");
        Ok(results)
    }
}
