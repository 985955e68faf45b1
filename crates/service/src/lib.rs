//! Service layer for citeblock
//!
//! Orchestrates a dedup run: readiness gate, the CPU stages, persistence and
//! completion events.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::let_underscore_must_use, reason = "Intentionally ignoring results")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]

mod config;
mod dedup_service;
mod error;
mod readiness;
mod run_guard;

pub use config::DedupConfig;
pub use dedup_service::{DedupEvent, DedupService, RunResult, RunStatus};
pub use error::ServiceError;
pub use readiness::{Quiescence, wait_for_quiescence};
pub use run_guard::{RunGuard, RunRegistry, RunState};
