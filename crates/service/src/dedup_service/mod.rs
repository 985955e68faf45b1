mod stages;
mod sweep;


use std::sync::Arc;
use std::time::Duration;

use citeblock_core::{BlockingModel, IndexStats, ReviewId};
use citeblock_storage::{CitationStore, DedupeIndexStore};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::DedupConfig;
use crate::readiness::{Quiescence, wait_for_quiescence};
use crate::run_guard::{RunGuard, RunRegistry, RunState};
use crate::ServiceError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Extra attempts after a transient storage failure.
const TRANSIENT_RETRIES: u32 = 1;
const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Caller-visible outcome; internal stage identity is not exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
    Failed,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub blocks_created: usize,
    pub memberships_created: usize,
}

impl RunResult {
    const fn with_status(status: RunStatus) -> Self {
        Self { status, blocks_created: 0, memberships_created: 0 }
    }

    const fn done(stats: IndexStats) -> Self {
        Self {
            status: RunStatus::Done,
            blocks_created: stats.blocks,
            memberships_created: stats.memberships,
        }
    }
}

/// Published once per finished run (not for refused ones).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupEvent {
    pub review_id: ReviewId,
    pub status: RunStatus,
    pub blocks_created: usize,
    pub memberships_created: usize,
}

/// Builds and persists the block index of a review.
///
/// At most one run per review at a time, enforced within this process only. A
/// run for the same review in another process is not refused; the Postgres
/// backend's transaction-scoped advisory lock merely serializes the two
/// processes' clear and replace transactions.
pub struct DedupService<S> {
    storage: Arc<S>,
    config: DedupConfig,
    registry: RunRegistry,
    event_tx: broadcast::Sender<DedupEvent>,
}

impl<S> DedupService<S>
where
    S: CitationStore + DedupeIndexStore + 'static,
{
    #[must_use]
    pub fn new(storage: Arc<S>, config: DedupConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { storage, config, registry: RunRegistry::new(), event_tx }
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DedupEvent> {
        self.event_tx.subscribe()
    }

    /// State of the review's current run, or the outcome of its last one.
    #[must_use]
    pub fn run_state(&self, review_id: ReviewId) -> RunState {
        self.registry.state(review_id)
    }

    pub async fn run_dedup(&self, review_id: ReviewId) -> RunResult {
        self.run_dedup_with(review_id, &CancellationToken::new()).await
    }

    /// [`DedupService::run_dedup`] that gives up at the next stage boundary
    /// once `cancel` fires.
    ///
    /// A transient storage failure reruns the whole run once; the run is
    /// idempotent, so nothing from the failed attempt survives.
    pub async fn run_dedup_with(&self, review_id: ReviewId, cancel: &CancellationToken) -> RunResult {
        let Some(mut guard) = self.registry.try_acquire(review_id) else {
            tracing::warn!(
                review_id = %review_id,
                error = %ServiceError::AlreadyRunning(review_id),
                "dedup run refused"
            );
            return RunResult::with_status(RunStatus::AlreadyRunning);
        };

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(review_id = %review_id, %run_id, "dedup run started");

        let mut attempt = 0;
        let outcome = loop {
            match self.execute(&mut guard, cancel).await {
                Err(e)
                    if e.is_transient() && attempt < TRANSIENT_RETRIES && !cancel.is_cancelled() =>
                {
                    attempt += 1;
                    tracing::warn!(
                        review_id = %review_id,
                        %run_id,
                        attempt,
                        error = %e,
                        "transient failure, rerunning from the start"
                    );
                    guard.transition(RunState::Idle);
                    tokio::time::sleep(TRANSIENT_RETRY_DELAY).await;
                }
                outcome => break outcome,
            }
        };

        let result = match outcome {
            Ok(stats) => {
                guard.transition(RunState::Done);
                tracing::info!(
                    review_id = %review_id,
                    %run_id,
                    blocks = stats.blocks,
                    memberships = stats.memberships,
                    elapsed_ms = started.elapsed().as_millis(),
                    "dedup run done"
                );
                RunResult::done(stats)
            },
            Err(e) => {
                guard.transition(RunState::Failed);
                tracing::error!(
                    review_id = %review_id,
                    %run_id,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis(),
                    "dedup run failed"
                );
                RunResult::with_status(RunStatus::Failed)
            },
        };
        drop(guard);

        // No subscribers is fine.
        let _ = self.event_tx.send(DedupEvent {
            review_id,
            status: result.status,
            blocks_created: result.blocks_created,
            memberships_created: result.memberships_created,
        });
        result
    }

    async fn execute(
        &self,
        guard: &mut RunGuard,
        cancel: &CancellationToken,
    ) -> Result<IndexStats, ServiceError> {
        let review_id = guard.review_id();
        let model = BlockingModel::load(&self.config.model_path)?;

        let gate = Quiescence {
            window: self.config.quiescence_window,
            poll_interval: self.config.poll_interval,
            max_wait: self.config.max_wait,
        };
        wait_for_quiescence(self.storage.as_ref(), review_id, gate, cancel).await?;

        if self.storage.count_citations(review_id).await? == 0 {
            tracing::info!(review_id = %review_id, "review has no records, nothing to block");
            self.storage.clear_dedupe_index(review_id).await?;
            return Ok(IndexStats::default());
        }
        if !self.storage.has_undeduplicated(review_id).await? {
            return Err(ServiceError::NothingToDeduplicate(review_id));
        }

        guard.transition(RunState::Indexing);
        self.storage.clear_dedupe_index(review_id).await?;
        let records = self.storage.get_citations(review_id).await?;
        let record_count = records.len();
        let indexed = stages::index(model, records).await?;
        check_cancelled(cancel, review_id)?;

        guard.transition(RunState::Blocking);
        let index = stages::block(review_id, indexed, self.config.block_shards).await?;
        tracing::debug!(
            review_id = %review_id,
            records = record_count,
            keys = index.blocking_map.len(),
            blocks = index.blocks.len(),
            "blocking done"
        );
        check_cancelled(cancel, review_id)?;

        guard.transition(RunState::Covering);
        let index = stages::cover(index).await?;
        check_cancelled(cancel, review_id)?;

        guard.transition(RunState::Partitioning);
        let index = stages::partition(index).await?;
        check_cancelled(cancel, review_id)?;

        Ok(self.storage.replace_dedupe_index(&index).await?)
    }
}

fn check_cancelled(cancel: &CancellationToken, review_id: ReviewId) -> Result<(), ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled(review_id));
    }
    Ok(())
}
