//! PostgreSQL storage backend using sqlx.
//!
//! Split into modular files by domain concern.

// Row counts are bounded by PostgreSQL limits
#![allow(
    clippy::arithmetic_side_effects,
    reason = "DB row counts are bounded by PostgreSQL limits"
)]

mod citations;
mod dedupe_index;

use crate::error::StorageError;
use citeblock_core::{
    BlockId, CitationId, CitationRecord, PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS,
    PG_POOL_MAX_CONNECTIONS, ReviewId,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use super::pg_migrations::run_pg_migrations;

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(std::time::Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        run_pg_migrations(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;
        tracing::info!("PgStorage initialized");
        Ok(Self { pool })
    }
}

pub(crate) fn row_to_citation(row: &PgRow) -> Result<CitationRecord, StorageError> {
    Ok(CitationRecord {
        id: CitationId(row.try_get("id")?),
        review_id: ReviewId(row.try_get("review_id")?),
        title: row.try_get("title")?,
        authors: row.try_get("authors")?,
        abstract_text: row.try_get("abstract")?,
        publication_year: row.try_get::<Option<i16>, _>("pub_year")?.map(i32::from),
        doi: row.try_get("doi")?,
    })
}

pub(crate) fn to_block_ids(raw: Vec<i64>) -> Vec<BlockId> {
    raw.into_iter().map(BlockId).collect()
}

pub(crate) fn to_raw_ids(ids: &[BlockId]) -> Vec<i64> {
    ids.iter().map(|id| id.0).collect()
}

pub(crate) fn to_count(raw: i64) -> Result<usize, StorageError> {
    usize::try_from(raw).map_err(|e| StorageError::DataCorruption {
        context: format!("negative row count {raw}"),
        source: Box::new(e),
    })
}
