use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citeblock_core::{CitationId, CitationRecord, DedupeStatus, NewCitation, ReviewId};

use crate::error::StorageError;

/// Read and maintenance operations on a review's citations.
#[async_trait]
pub trait CitationStore: Send + Sync {
    /// Insert citations into a review in one transaction. Returns their ids in input order.
    async fn insert_citations(
        &self,
        review_id: ReviewId,
        citations: &[NewCitation],
    ) -> Result<Vec<CitationId>, StorageError>;

    /// Every citation of the review, ascending by id.
    async fn get_citations(&self, review_id: ReviewId)
    -> Result<Vec<CitationRecord>, StorageError>;

    async fn count_citations(&self, review_id: ReviewId) -> Result<usize, StorageError>;

    /// Whether any citation of the review is still unresolved.
    async fn has_undeduplicated(&self, review_id: ReviewId) -> Result<bool, StorageError>;

    /// Creation time of the newest citation, `None` for an empty review.
    async fn latest_citation_created_at(
        &self,
        review_id: ReviewId,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Reviews with at least one unresolved citation, ascending.
    async fn eligible_review_ids(&self) -> Result<Vec<ReviewId>, StorageError>;

    /// Record a dedup resolution. `NotFound` when the citation does not exist.
    async fn set_dedupe_status(
        &self,
        citation_id: CitationId,
        status: DedupeStatus,
    ) -> Result<(), StorageError>;
}
