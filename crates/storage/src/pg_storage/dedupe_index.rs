//! DedupeIndexStore implementation for PgStorage.

use super::*;

use crate::traits::DedupeIndexStore;
use async_trait::async_trait;
use citeblock_core::blocking::candidate_blocks;
use citeblock_core::{
    Block, BlockMembership, BlockingKey, CandidateBlock, CandidatePair, CoveredBlocks,
    DedupeIndex, DedupeStatus, INSERT_BATCH_ROWS, IndexStats, SmallerCoverage,
};
use sqlx::{PgConnection, Postgres, QueryBuilder};

const INDEX_TABLES: [&str; 5] = [
    "dedupe_smaller_coverage",
    "dedupe_covered_blocks",
    "dedupe_plural_block",
    "dedupe_plural_key",
    "dedupe_blocking_map",
];

/// Serializes writers of the same review across processes until commit.
async fn lock_review(conn: &mut PgConnection, review_id: ReviewId) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(i64::from(review_id.0))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn delete_index(conn: &mut PgConnection, review_id: ReviewId) -> Result<(), sqlx::Error> {
    for table in INDEX_TABLES {
        sqlx::query(&format!("DELETE FROM {table} WHERE review_id = $1"))
            .bind(review_id.0)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_index(conn: &mut PgConnection, index: &DedupeIndex) -> Result<(), sqlx::Error> {
    let review = index.review_id.0;

    for chunk in index.blocking_map.chunks(INSERT_BATCH_ROWS) {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO dedupe_blocking_map (review_id, citation_id, block_key) ");
        qb.push_values(chunk, |mut row, entry| {
            row.push_bind(review)
                .push_bind(entry.citation_id.0)
                .push_bind(entry.block_key.as_str().to_owned());
        });
        qb.build().execute(&mut *conn).await?;
    }

    for chunk in index.blocks.chunks(INSERT_BATCH_ROWS) {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO dedupe_plural_key (review_id, block_id, block_key) ");
        qb.push_values(chunk, |mut row, block| {
            row.push_bind(review)
                .push_bind(block.block_id.0)
                .push_bind(block.block_key.as_str().to_owned());
        });
        qb.build().execute(&mut *conn).await?;
    }

    for chunk in index.memberships.chunks(INSERT_BATCH_ROWS) {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO dedupe_plural_block (review_id, block_id, citation_id) ");
        qb.push_values(chunk, |mut row, m| {
            row.push_bind(review).push_bind(m.block_id.0).push_bind(m.citation_id.0);
        });
        qb.build().execute(&mut *conn).await?;
    }

    for chunk in index.covered.chunks(INSERT_BATCH_ROWS) {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO dedupe_covered_blocks (review_id, citation_id, sorted_ids) ");
        qb.push_values(chunk, |mut row, c| {
            row.push_bind(review)
                .push_bind(c.citation_id.0)
                .push_bind(to_raw_ids(&c.sorted_block_ids));
        });
        qb.build().execute(&mut *conn).await?;
    }

    for chunk in index.smaller.chunks(INSERT_BATCH_ROWS) {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO dedupe_smaller_coverage (review_id, citation_id, block_id, smaller_ids) ",
        );
        qb.push_values(chunk, |mut row, s| {
            row.push_bind(review)
                .push_bind(s.citation_id.0)
                .push_bind(s.block_id.0)
                .push_bind(to_raw_ids(&s.smaller_ids));
        });
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

impl PgStorage {
    async fn swap_index(&self, index: &DedupeIndex) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        lock_review(&mut tx, index.review_id).await?;
        delete_index(&mut tx, index.review_id).await?;
        insert_index(&mut tx, index).await?;
        tx.commit().await
    }
}

#[async_trait]
impl DedupeIndexStore for PgStorage {
    async fn replace_dedupe_index(&self, index: &DedupeIndex) -> Result<IndexStats, StorageError> {
        // Dropping the uncommitted transaction on error rolls everything back.
        self.swap_index(index).await.map_err(|e| {
            tracing::error!(review_id = %index.review_id, error = %e, "block index write rolled back");
            StorageError::WriteFailed { review_id: index.review_id.0, reason: e.to_string() }
        })?;
        let stats = index.stats();
        tracing::debug!(
            review_id = %index.review_id,
            blocks = stats.blocks,
            memberships = stats.memberships,
            "block index replaced"
        );
        Ok(stats)
    }

    async fn clear_dedupe_index(&self, review_id: ReviewId) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        lock_review(&mut tx, review_id).await?;
        delete_index(&mut tx, review_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_blocks(&self, review_id: ReviewId) -> Result<Vec<Block>, StorageError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT block_id, block_key FROM dedupe_plural_key
             WHERE review_id = $1 ORDER BY block_id",
        )
        .bind(review_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(block_id, key)| Block {
                block_id: BlockId(block_id),
                review_id,
                block_key: BlockingKey::from_stored(key),
            })
            .collect())
    }

    async fn get_block_memberships(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<BlockMembership>, StorageError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT block_id, citation_id FROM dedupe_plural_block
             WHERE review_id = $1 ORDER BY block_id, citation_id",
        )
        .bind(review_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(block_id, citation_id)| BlockMembership {
                block_id: BlockId(block_id),
                citation_id: CitationId(citation_id),
                review_id,
            })
            .collect())
    }

    async fn get_covered_blocks(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CoveredBlocks>, StorageError> {
        let rows: Vec<(i64, Vec<i64>)> = sqlx::query_as(
            "SELECT citation_id, sorted_ids FROM dedupe_covered_blocks
             WHERE review_id = $1 ORDER BY citation_id",
        )
        .bind(review_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(citation_id, ids)| CoveredBlocks {
                citation_id: CitationId(citation_id),
                review_id,
                sorted_block_ids: to_block_ids(ids),
            })
            .collect())
    }

    async fn get_smaller_coverage(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<SmallerCoverage>, StorageError> {
        let rows: Vec<(i64, i64, Vec<i64>)> = sqlx::query_as(
            "SELECT citation_id, block_id, smaller_ids FROM dedupe_smaller_coverage
             WHERE review_id = $1 ORDER BY citation_id, block_id",
        )
        .bind(review_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(citation_id, block_id, ids)| SmallerCoverage {
                citation_id: CitationId(citation_id),
                review_id,
                block_id: BlockId(block_id),
                smaller_ids: to_block_ids(ids),
            })
            .collect())
    }

    async fn get_candidate_blocks(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CandidateBlock>, StorageError> {
        let smaller = self.get_smaller_coverage(review_id).await?;
        Ok(candidate_blocks(&smaller))
    }

    async fn get_candidate_pairs(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CandidatePair>, StorageError> {
        // Empty arrays never overlap, so a pair with no smaller blocks is kept.
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            "SELECT a.citation_id, b.citation_id, a.block_id
             FROM dedupe_smaller_coverage a
             JOIN dedupe_smaller_coverage b
               ON b.review_id = a.review_id
              AND b.block_id = a.block_id
              AND a.citation_id < b.citation_id
             JOIN citations ca ON ca.id = a.citation_id
             JOIN citations cb ON cb.id = b.citation_id
             WHERE a.review_id = $1
               AND NOT (a.smaller_ids && b.smaller_ids)
               AND ca.dedupe_status <> $2
               AND cb.dedupe_status <> $2
             ORDER BY a.block_id, a.citation_id, b.citation_id",
        )
        .bind(review_id.0)
        .bind(DedupeStatus::Duplicate.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(first, second, block_id)| CandidatePair {
                first: CitationId(first),
                second: CitationId(second),
                block_id: BlockId(block_id),
            })
            .collect())
    }

    async fn get_index_stats(&self, review_id: ReviewId) -> Result<IndexStats, StorageError> {
        let (keys, blocks, memberships, covered, smaller): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                    (SELECT COUNT(*) FROM dedupe_blocking_map WHERE review_id = $1),
                    (SELECT COUNT(*) FROM dedupe_plural_key WHERE review_id = $1),
                    (SELECT COUNT(*) FROM dedupe_plural_block WHERE review_id = $1),
                    (SELECT COUNT(*) FROM dedupe_covered_blocks WHERE review_id = $1),
                    (SELECT COUNT(*) FROM dedupe_smaller_coverage WHERE review_id = $1)",
            )
            .bind(review_id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(IndexStats {
            blocking_keys: to_count(keys)?,
            blocks: to_count(blocks)?,
            memberships: to_count(memberships)?,
            covered_records: to_count(covered)?,
            smaller_coverage_rows: to_count(smaller)?,
        })
    }
}
