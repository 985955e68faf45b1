//! Storage backend trait abstraction
//!
//! Async domain traits implemented by the PostgreSQL backend, the in-memory
//! backend and the enum-dispatch `StorageBackend`.

pub mod citation;
pub mod dedupe_index;

pub use citation::CitationStore;
pub use dedupe_index::DedupeIndexStore;
