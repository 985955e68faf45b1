//! Typed error enum for the service layer.
//!
//! Unifies model, storage and orchestration failures into a single error type.
//! Callers of a dedup run only ever see the mapped [`crate::RunStatus`].

use citeblock_core::{CoreError, ReviewId};
use citeblock_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage operation failed (DB, not found, write rollback, etc.).
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Model missing or invalid, or evaluated out of order.
    #[error("model: {0}")]
    Core(#[from] CoreError),

    /// Another run for the same review holds the guard.
    #[error("a dedup run for review {0} is already in progress")]
    AlreadyRunning(ReviewId),

    /// The review has records but every one is already resolved.
    #[error("review {0} has no un-deduplicated records")]
    NothingToDeduplicate(ReviewId),

    /// Imports kept arriving for longer than the readiness gate allows.
    #[error("review {review_id} still receiving records after {waited_secs}s")]
    ReadinessTimeout { review_id: ReviewId, waited_secs: u64 },

    #[error("dedup run for review {0} cancelled")]
    Cancelled(ReviewId),

    /// A CPU stage panicked or its blocking task was aborted.
    #[error("worker: {0}")]
    Worker(String),
}

impl ServiceError {
    /// Whether rerunning right away may succeed. A readiness timeout is not:
    /// the review is still being imported.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}
