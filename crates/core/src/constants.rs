//! Shared constants for citeblock.

/// A review is ready for dedup once its newest citation is at least this old.
pub const QUIESCENCE_WINDOW_SECS: u64 = 60;

/// Interval between readiness checks while a review is still receiving imports.
pub const QUIESCENCE_POLL_SECS: u64 = 15;

/// Give up waiting for a review to go quiet after this long.
pub const QUIESCENCE_MAX_WAIT_SECS: u64 = 3600;

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Rows per multi-row INSERT when writing the block index.
///
/// Postgres caps a statement at 65535 bind parameters; the widest index
/// table binds four per row.
pub const INSERT_BATCH_ROWS: usize = 5000;

/// Default location of the trained blocking model.
pub const DEFAULT_MODEL_PATH: &str = "models/dedupe_citations_settings.json";
