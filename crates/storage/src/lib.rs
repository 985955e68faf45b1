//! Storage layer for citeblock
//!
//! PostgreSQL storage for citations and the per-review block index, plus an
//! in-memory backend with the same contract.

mod backend;
pub mod error;
mod memory;
mod pg_migrations;
mod pg_storage;
pub mod traits;

#[cfg(test)]
mod tests;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use pg_storage::PgStorage;
pub use traits::{CitationStore, DedupeIndexStore};
