//! Per-review mutual exclusion and run state tracking.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use citeblock_core::ReviewId;
use serde::{Deserialize, Serialize};

/// Orchestrator states. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Indexing,
    Blocking,
    Covering,
    Partitioning,
    Done,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Indexing => "indexing",
            Self::Blocking => "blocking",
            Self::Covering => "covering",
            Self::Partitioning => "partitioning",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct Registry {
    active: HashSet<ReviewId>,
    states: HashMap<ReviewId, RunState>,
}

/// In-process registry of active runs, keyed by review.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl RunRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the maps inconsistent:
    // every critical section is a single insert or remove.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the review. `None` when a run for it is already active.
    #[must_use]
    pub fn try_acquire(&self, review_id: ReviewId) -> Option<RunGuard> {
        let mut registry = self.lock();
        if !registry.active.insert(review_id) {
            return None;
        }
        registry.states.insert(review_id, RunState::Idle);
        Some(RunGuard { registry: self.clone(), review_id, state: RunState::Idle })
    }

    /// Current state of the review's run, or the outcome of its last run.
    #[must_use]
    pub fn state(&self, review_id: ReviewId) -> RunState {
        self.lock().states.get(&review_id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_running(&self, review_id: ReviewId) -> bool {
        self.lock().active.contains(&review_id)
    }
}

/// Held for the lifetime of one run. Dropping it releases the review.
///
/// A guard dropped before reaching a terminal state (the run's future was
/// cancelled, or a stage panicked) records `Failed`.
#[derive(Debug)]
pub struct RunGuard {
    registry: RunRegistry,
    review_id: ReviewId,
    state: RunState,
}

impl RunGuard {
    #[must_use]
    pub const fn review_id(&self) -> ReviewId {
        self.review_id
    }

    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    pub fn transition(&mut self, next: RunState) {
        tracing::debug!(review_id = %self.review_id, from = %self.state, to = %next, "run state");
        self.state = next;
        self.registry.lock().states.insert(self.review_id, next);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        registry.active.remove(&self.review_id);
        if !self.state.is_terminal() {
            registry.states.insert(self.review_id, RunState::Failed);
        }
    }
}
