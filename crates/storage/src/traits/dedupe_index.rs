use async_trait::async_trait;
use citeblock_core::{
    Block, BlockMembership, CandidateBlock, CandidatePair, CoveredBlocks, DedupeIndex, IndexStats,
    ReviewId, SmallerCoverage,
};

use crate::error::StorageError;

/// The five derived relations of a review, replaced as one snapshot.
#[async_trait]
pub trait DedupeIndexStore: Send + Sync {
    /// Atomically swap the review's stored index for `index`.
    ///
    /// On error nothing changes: readers keep seeing the previous snapshot.
    async fn replace_dedupe_index(&self, index: &DedupeIndex) -> Result<IndexStats, StorageError>;

    /// Delete every derived row of the review.
    async fn clear_dedupe_index(&self, review_id: ReviewId) -> Result<(), StorageError>;

    /// Plural blocks, ascending by block id.
    async fn get_blocks(&self, review_id: ReviewId) -> Result<Vec<Block>, StorageError>;

    /// Ordered by `(block_id, citation_id)`.
    async fn get_block_memberships(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<BlockMembership>, StorageError>;

    /// Ordered by citation id.
    async fn get_covered_blocks(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CoveredBlocks>, StorageError>;

    /// Ordered by `(citation_id, block_id)`.
    async fn get_smaller_coverage(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<SmallerCoverage>, StorageError>;

    /// Each block with its members and their smaller ids, ascending by block id.
    async fn get_candidate_blocks(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CandidateBlock>, StorageError>;

    /// Pairs to score, each once at its smallest shared block.
    ///
    /// Citations already marked duplicate are left out. Ordered by
    /// `(block_id, first, second)`.
    async fn get_candidate_pairs(
        &self,
        review_id: ReviewId,
    ) -> Result<Vec<CandidatePair>, StorageError>;

    async fn get_index_stats(&self, review_id: ReviewId) -> Result<IndexStats, StorageError>;
}
