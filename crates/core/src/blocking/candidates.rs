use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SmallerCoverage;
use crate::ids::{BlockId, CitationId, ReviewId};

/// Two records sharing a block, reported at their smallest shared block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    /// Always the smaller citation id of the two.
    pub first: CitationId,
    pub second: CitationId,
    pub block_id: BlockId,
}

/// One member of a candidate block with its smaller-coverage list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateMember {
    pub citation_id: CitationId,
    pub smaller_ids: Vec<BlockId>,
}

/// A plural block with everything a pairwise scorer needs to skip redundant
/// comparisons inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateBlock {
    pub review_id: ReviewId,
    pub block_id: BlockId,
    /// Ascending by citation id.
    pub members: Vec<CandidateMember>,
}

impl CandidateBlock {
    /// Pairs inside this block that are not compared at a smaller block.
    #[must_use]
    pub fn pairs(&self) -> Vec<CandidatePair> {
        let mut out = Vec::new();
        for (i, a) in self.members.iter().enumerate() {
            for b in &self.members[i + 1..] {
                if is_smallest_shared_block(&a.smaller_ids, &b.smaller_ids) {
                    out.push(CandidatePair {
                        first: a.citation_id,
                        second: b.citation_id,
                        block_id: self.block_id,
                    });
                }
            }
        }
        out
    }
}

/// Group smaller-coverage rows into blocks ordered by block id.
#[must_use]
pub fn candidate_blocks(smaller: &[SmallerCoverage]) -> Vec<CandidateBlock> {
    let mut by_block: BTreeMap<BlockId, CandidateBlock> = BTreeMap::new();
    for row in smaller {
        by_block
            .entry(row.block_id)
            .or_insert_with(|| CandidateBlock {
                review_id: row.review_id,
                block_id: row.block_id,
                members: Vec::new(),
            })
            .members
            .push(CandidateMember {
                citation_id: row.citation_id,
                smaller_ids: row.smaller_ids.clone(),
            });
    }
    by_block
        .into_values()
        .map(|mut block| {
            block.members.sort_unstable_by_key(|m| m.citation_id);
            block
        })
        .collect()
}

/// True when the two smaller-id lists share nothing.
///
/// Both inputs are ascending. For two members of block `B`, disjoint smaller
/// lists mean `B` is the smallest block they share.
#[must_use]
pub fn is_smallest_shared_block(a: &[BlockId], b: &[BlockId]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => return false,
        }
    }
    true
}

/// Every distinct pair of records sharing a plural block, exactly once.
///
/// Sorted by `(block_id, first, second)`.
#[must_use]
pub fn candidate_pairs(smaller: &[SmallerCoverage]) -> Vec<CandidatePair> {
    candidate_blocks(smaller).iter().flat_map(CandidateBlock::pairs).collect()
}
