//! The block index of one review.
//!
//! Five relations, each derived from the previous one:
//! blocking map (every emitted key) → plural blocks → memberships →
//! covered blocks per record → smaller coverage per membership.

mod builder;
mod candidates;
mod coverage;
mod partition;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use builder::{BlockAssignment, BlockBuilder};
pub use candidates::{
    CandidateBlock, CandidateMember, CandidatePair, candidate_blocks, candidate_pairs,
    is_smallest_shared_block,
};
pub use coverage::covered_blocks;
pub use partition::{smaller_coverage, smaller_ids};

use crate::ids::{BlockId, CitationId, ReviewId};
use crate::model::PredicateId;

/// Opaque blocking key as persisted: `"{key}:{predicate_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockingKey(String);

impl BlockingKey {
    #[must_use]
    pub fn new(key: &str, predicate_id: PredicateId) -> Self {
        Self(format!("{key}:{predicate_id}"))
    }

    /// Wrap an already rendered key read back from storage.
    #[must_use]
    pub const fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One predicate emission: the record satisfies the key. Singletons included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockingMapEntry {
    pub citation_id: CitationId,
    pub review_id: ReviewId,
    pub block_key: BlockingKey,
}

/// A plural key (two or more distinct member records) and its surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub block_id: BlockId,
    pub review_id: ReviewId,
    pub block_key: BlockingKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockMembership {
    pub block_id: BlockId,
    pub citation_id: CitationId,
    pub review_id: ReviewId,
}

/// Every block a record belongs to, ascending, no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoveredBlocks {
    pub citation_id: CitationId,
    pub review_id: ReviewId,
    pub sorted_block_ids: Vec<BlockId>,
}

/// For one membership, the record's covered blocks with a smaller id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SmallerCoverage {
    pub citation_id: CitationId,
    pub review_id: ReviewId,
    pub block_id: BlockId,
    pub smaller_ids: Vec<BlockId>,
}

/// Row counts of the five relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub blocking_keys: usize,
    pub blocks: usize,
    pub memberships: usize,
    pub covered_records: usize,
    pub smaller_coverage_rows: usize,
}

/// Complete, internally consistent block index of one review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeIndex {
    pub review_id: ReviewId,
    pub blocking_map: Vec<BlockingMapEntry>,
    pub blocks: Vec<Block>,
    pub memberships: Vec<BlockMembership>,
    pub covered: Vec<CoveredBlocks>,
    pub smaller: Vec<SmallerCoverage>,
}

impl DedupeIndex {
    #[must_use]
    pub fn empty(review_id: ReviewId) -> Self {
        Self { review_id, ..Self::default() }
    }

    /// Run block building, coverage and partitioning over the emissions.
    #[must_use]
    pub fn from_emissions(
        review_id: ReviewId,
        blocking_map: Vec<BlockingMapEntry>,
        shards: usize,
    ) -> Self {
        let BlockAssignment { blocks, memberships } =
            BlockBuilder::new(review_id).with_shards(shards).build(&blocking_map);
        let covered = covered_blocks(review_id, &memberships);
        let smaller = smaller_coverage(review_id, &memberships, &covered);
        Self { review_id, blocking_map, blocks, memberships, covered, smaller }
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            blocking_keys: self.blocking_map.len(),
            blocks: self.blocks.len(),
            memberships: self.memberships.len(),
            covered_records: self.covered.len(),
            smaller_coverage_rows: self.smaller.len(),
        }
    }

    /// Candidate pairs, each emitted once at its smallest shared block.
    #[must_use]
    pub fn candidate_pairs(&self) -> Vec<CandidatePair> {
        candidate_pairs(&self.smaller)
    }
}

#[cfg(test)]
mod tests;
