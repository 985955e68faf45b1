//! Unified storage backend with enum dispatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citeblock_core::{
    Block, BlockMembership, CandidateBlock, CandidatePair, CitationId, CitationRecord,
    CoveredBlocks, DedupeIndex, DedupeStatus, IndexStats, NewCitation, ReviewId, SmallerCoverage,
};

use crate::error::StorageError;
use crate::traits::{CitationStore, DedupeIndexStore};

macro_rules! dispatch {
    ($self:expr, $trait:path, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            StorageBackend::Postgres(s) => <crate::pg_storage::PgStorage as $trait>::$method(s, $($arg),*).await,
            StorageBackend::Memory(s) => <crate::memory::MemoryStorage as $trait>::$method(s, $($arg),*).await,
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    Postgres(crate::pg_storage::PgStorage),
    Memory(crate::memory::MemoryStorage),
}

impl StorageBackend {
    pub async fn new_postgres(database_url: &str) -> Result<Self, StorageError> {
        Ok(Self::Postgres(crate::pg_storage::PgStorage::new(database_url).await?))
    }

    #[must_use]
    pub fn new_memory() -> Self {
        Self::Memory(crate::memory::MemoryStorage::new())
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

// ── CitationStore ────────────────────────────────────────────────

#[async_trait]
impl CitationStore for StorageBackend {
    async fn insert_citations(
        &self,
        review_id: ReviewId,
        citations: &[NewCitation],
    ) -> Result<Vec<CitationId>, StorageError> {
        dispatch!(self, CitationStore, insert_citations(review_id, citations))
    }

    async fn get_citations(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CitationRecord>, StorageError> {
        dispatch!(self, CitationStore, get_citations(review_id))
    }

    async fn count_citations(&self, review_id: ReviewId) -> Result<usize, StorageError> {
        dispatch!(self, CitationStore, count_citations(review_id))
    }

    async fn has_undeduplicated(&self, review_id: ReviewId) -> Result<bool, StorageError> {
        dispatch!(self, CitationStore, has_undeduplicated(review_id))
    }

    async fn latest_citation_created_at(
        &self,
        review_id: ReviewId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        dispatch!(self, CitationStore, latest_citation_created_at(review_id))
    }

    async fn eligible_review_ids(&self) -> Result<Vec<ReviewId>, StorageError> {
        dispatch!(self, CitationStore, eligible_review_ids())
    }

    async fn set_dedupe_status(
        &self,
        citation_id: CitationId,
        status: DedupeStatus,
    ) -> Result<(), StorageError> {
        dispatch!(self, CitationStore, set_dedupe_status(citation_id, status))
    }
}

// ── DedupeIndexStore ─────────────────────────────────────────────

#[async_trait]
impl DedupeIndexStore for StorageBackend {
    async fn replace_dedupe_index(&self, index: &DedupeIndex) -> Result<IndexStats, StorageError> {
        dispatch!(self, DedupeIndexStore, replace_dedupe_index(index))
    }

    async fn clear_dedupe_index(&self, review_id: ReviewId) -> Result<(), StorageError> {
        dispatch!(self, DedupeIndexStore, clear_dedupe_index(review_id))
    }

    async fn get_blocks(&self, review_id: ReviewId) -> Result<Vec<Block>, StorageError> {
        dispatch!(self, DedupeIndexStore, get_blocks(review_id))
    }

    async fn get_block_memberships(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<BlockMembership>, StorageError> {
        dispatch!(self, DedupeIndexStore, get_block_memberships(review_id))
    }

    async fn get_covered_blocks(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CoveredBlocks>, StorageError> {
        dispatch!(self, DedupeIndexStore, get_covered_blocks(review_id))
    }

    async fn get_smaller_coverage(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<SmallerCoverage>, StorageError> {
        dispatch!(self, DedupeIndexStore, get_smaller_coverage(review_id))
    }

    async fn get_candidate_blocks(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CandidateBlock>, StorageError> {
        dispatch!(self, DedupeIndexStore, get_candidate_blocks(review_id))
    }

    async fn get_candidate_pairs(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CandidatePair>, StorageError> {
        dispatch!(self, DedupeIndexStore, get_candidate_pairs(review_id))
    }

    async fn get_index_stats(&self, review_id: ReviewId) -> Result<IndexStats, StorageError> {
        dispatch!(self, DedupeIndexStore, get_index_stats(review_id))
    }
}
