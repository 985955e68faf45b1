//! CitationStore implementation for PgStorage.

use super::*;

use crate::traits::CitationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citeblock_core::{DedupeStatus, NewCitation};

#[async_trait]
impl CitationStore for PgStorage {
    async fn insert_citations(
        &self,
        review_id: ReviewId,
        citations: &[NewCitation],
    ) -> Result<Vec<CitationId>, StorageError> {
        let mut ids = Vec::with_capacity(citations.len());
        if citations.is_empty() {
            return Ok(ids);
        }
        let mut tx = self.pool.begin().await?;
        for citation in citations {
            let pub_year = citation.publication_year.and_then(|y| {
                i16::try_from(y)
                    .inspect_err(|_| tracing::warn!(year = y, "publication year out of range, dropped"))
                    .ok()
            });
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO citations
                    (review_id, title, authors, abstract, pub_year, doi, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()))
                 RETURNING id",
            )
            .bind(review_id.0)
            .bind(&citation.title)
            .bind(&citation.authors)
            .bind(&citation.abstract_text)
            .bind(pub_year)
            .bind(&citation.doi)
            .bind(citation.created_at)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(CitationId(id));
        }
        tx.commit().await?;
        tracing::debug!(review_id = %review_id, inserted = ids.len(), "citations inserted");
        Ok(ids)
    }

    async fn get_citations(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CitationRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, review_id, title, authors, abstract, pub_year, doi
             FROM citations WHERE review_id = $1 ORDER BY id",
        )
        .bind(review_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_citation).collect()
    }

    async fn count_citations(&self, review_id: ReviewId) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM citations WHERE review_id = $1")
            .bind(review_id.0)
            .fetch_one(&self.pool)
            .await?;
        to_count(count)
    }

    async fn has_undeduplicated(&self, review_id: ReviewId) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM citations WHERE review_id = $1 AND dedupe_status = $2
             )",
        )
        .bind(review_id.0)
        .bind(DedupeStatus::Unresolved.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn latest_citation_created_at(
        &self,
        review_id: ReviewId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM citations WHERE review_id = $1")
                .bind(review_id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    async fn eligible_review_ids(&self) -> Result<Vec<ReviewId>, StorageError> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            "SELECT DISTINCT review_id FROM citations WHERE dedupe_status = $1 ORDER BY review_id",
        )
        .bind(DedupeStatus::Unresolved.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| ReviewId(id)).collect())
    }

    async fn set_dedupe_status(
        &self,
        citation_id: CitationId,
        status: DedupeStatus,
    ) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE citations SET dedupe_status = $2 WHERE id = $1")
            .bind(citation_id.0)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                entity: "citation",
                id: citation_id.to_string(),
            });
        }
        Ok(())
    }
}
