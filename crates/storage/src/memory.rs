//! In-memory storage backend.
//!
//! Same contract as [`crate::PgStorage`], no persistence, so it only suits
//! embedding and tests; the CLI always needs `DATABASE_URL`. All state sits
//! behind one `RwLock`, so an index replacement is observed atomically by
//! readers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citeblock_core::blocking::candidate_blocks;
use citeblock_core::{
    Block, BlockMembership, CandidateBlock, CandidatePair, CitationId, CitationRecord,
    CoveredBlocks, DedupeIndex, DedupeStatus, IndexStats, NewCitation, ReviewId, SmallerCoverage,
};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::{CitationStore, DedupeIndexStore};

#[derive(Debug, Clone)]
struct StoredCitation {
    record: CitationRecord,
    created_at: DateTime<Utc>,
    status: DedupeStatus,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    citations: BTreeMap<CitationId, StoredCitation>,
    indexes: HashMap<ReviewId, DedupeIndex>,
}

impl Inner {
    fn review_citations(&self, review_id: ReviewId) -> impl Iterator<Item = &StoredCitation> {
        self.citations.values().filter(move |c| c.record.review_id == review_id)
    }
}

/// Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CitationStore for MemoryStorage {
    async fn insert_citations(
        &self,
        review_id: ReviewId,
        citations: &[NewCitation],
    ) -> Result<Vec<CitationId>, StorageError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut ids = Vec::with_capacity(citations.len());
        for citation in citations {
            inner.next_id += 1;
            let id = CitationId(inner.next_id);
            let record = CitationRecord {
                id,
                review_id,
                title: citation.title.clone(),
                authors: citation.authors.clone(),
                abstract_text: citation.abstract_text.clone(),
                publication_year: citation.publication_year,
                doi: citation.doi.clone(),
            };
            inner.citations.insert(id, StoredCitation {
                record,
                created_at: citation.created_at.unwrap_or(now),
                status: DedupeStatus::Unresolved,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get_citations(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CitationRecord>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.review_citations(review_id).map(|c| c.record.clone()).collect())
    }

    async fn count_citations(&self, review_id: ReviewId) -> Result<usize, StorageError> {
        Ok(self.inner.read().await.review_citations(review_id).count())
    }

    async fn has_undeduplicated(&self, review_id: ReviewId) -> Result<bool, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.review_citations(review_id).any(|c| c.status == DedupeStatus::Unresolved))
    }

    async fn latest_citation_created_at(
        &self,
        review_id: ReviewId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.review_citations(review_id).map(|c| c.created_at).max())
    }

    async fn eligible_review_ids(&self) -> Result<Vec<ReviewId>, StorageError> {
        let inner = self.inner.read().await;
        let mut ids: Vec<ReviewId> = inner
            .citations
            .values()
            .filter(|c| c.status == DedupeStatus::Unresolved)
            .map(|c| c.record.review_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn set_dedupe_status(
        &self,
        citation_id: CitationId,
        status: DedupeStatus,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let stored = inner.citations.get_mut(&citation_id).ok_or_else(|| StorageError::NotFound {
            entity: "citation",
            id: citation_id.to_string(),
        })?;
        stored.status = status;
        Ok(())
    }
}

#[async_trait]
impl DedupeIndexStore for MemoryStorage {
    async fn replace_dedupe_index(&self, index: &DedupeIndex) -> Result<IndexStats, StorageError> {
        let stats = index.stats();
        self.inner.write().await.indexes.insert(index.review_id, index.clone());
        Ok(stats)
    }

    async fn clear_dedupe_index(&self, review_id: ReviewId) -> Result<(), StorageError> {
        self.inner.write().await.indexes.remove(&review_id);
        Ok(())
    }

    async fn get_blocks(&self, review_id: ReviewId) -> Result<Vec<Block>, StorageError> {
        let inner = self.inner.read().await;
        let mut blocks = inner.indexes.get(&review_id).map(|i| i.blocks.clone()).unwrap_or_default();
        blocks.sort_unstable_by_key(|b| b.block_id);
        Ok(blocks)
    }

    async fn get_block_memberships(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<BlockMembership>, StorageError> {
        let inner = self.inner.read().await;
        let mut rows =
            inner.indexes.get(&review_id).map(|i| i.memberships.clone()).unwrap_or_default();
        rows.sort_unstable();
        Ok(rows)
    }

    async fn get_covered_blocks(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CoveredBlocks>, StorageError> {
        let inner = self.inner.read().await;
        let mut rows = inner.indexes.get(&review_id).map(|i| i.covered.clone()).unwrap_or_default();
        rows.sort_unstable_by_key(|c| c.citation_id);
        Ok(rows)
    }

    async fn get_smaller_coverage(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<SmallerCoverage>, StorageError> {
        let inner = self.inner.read().await;
        let mut rows = inner.indexes.get(&review_id).map(|i| i.smaller.clone()).unwrap_or_default();
        rows.sort_unstable_by_key(|s| (s.citation_id, s.block_id));
        Ok(rows)
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
        let inner = self.inner.read().await;
        let Some(index) = inner.indexes.get(&review_id) else {
            return Ok(Vec::new());
        };
        let is_duplicate = |id: CitationId| {
            inner.citations.get(&id).is_some_and(|c| c.status == DedupeStatus::Duplicate)
        };
        Ok(index
            .candidate_pairs()
            .into_iter()
            .filter(|p| !is_duplicate(p.first) && !is_duplicate(p.second))
            .collect())
    }

    async fn get_index_stats(&self, review_id: ReviewId) -> Result<IndexStats, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.indexes.get(&review_id).map(DedupeIndex::stats).unwrap_or_default())
    }
}
