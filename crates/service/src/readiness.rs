//! Readiness gate: wait until a review stops receiving imports.
//!
//! Best effort only. An importer may still add records after the gate opens;
//! those are picked up by the next run.

use std::time::Duration;

use chrono::Utc;
use citeblock_core::ReviewId;
use citeblock_storage::CitationStore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ServiceError;

#[derive(Debug, Clone, Copy)]
pub struct Quiescence {
    pub window: Duration,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

/// Poll the newest record's creation time until it is older than the window.
///
/// An empty review is ready immediately.
pub async fn wait_for_quiescence<S>(
    store: &S,
    review_id: ReviewId,
    gate: Quiescence,
    cancel: &CancellationToken,
) -> Result<(), ServiceError>
where
    S: CitationStore + ?Sized,
{
    let started = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled(review_id));
        }
        let Some(latest) = store.latest_citation_created_at(review_id).await? else {
            return Ok(());
        };
        // Clock skew can put `latest` in the future; treat that as age zero.
        let age = (Utc::now() - latest).to_std().unwrap_or_default();
        if age >= gate.window {
            tracing::debug!(review_id = %review_id, age_secs = age.as_secs(), "review quiescent");
            return Ok(());
        }

        let waited = started.elapsed();
        if waited >= gate.max_wait {
            return Err(ServiceError::ReadinessTimeout { review_id, waited_secs: waited.as_secs() });
        }
        let pause = gate.poll_interval.min(gate.max_wait - waited);
        tracing::debug!(
            review_id = %review_id,
            age_secs = age.as_secs(),
            retry_in_secs = pause.as_secs(),
            "review still receiving records"
        );
        tokio::select! {
            () = cancel.cancelled() => return Err(ServiceError::Cancelled(review_id)),
            () = tokio::time::sleep(pause) => {},
        }
    }
}
