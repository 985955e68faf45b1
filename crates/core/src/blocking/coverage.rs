use std::collections::BTreeMap;

use super::{BlockMembership, CoveredBlocks};
use crate::ids::{BlockId, CitationId, ReviewId};

/// For every record in at least one plural block, its block ids ascending.
///
/// Records in no plural block get no row. Output is ordered by citation id.
#[must_use]
pub fn covered_blocks(review_id: ReviewId, memberships: &[BlockMembership]) -> Vec<CoveredBlocks> {
    let mut by_citation: BTreeMap<CitationId, Vec<BlockId>> = BTreeMap::new();
    for m in memberships {
        by_citation.entry(m.citation_id).or_default().push(m.block_id);
    }
    by_citation
        .into_iter()
        .map(|(citation_id, mut ids)| {
            ids.sort_unstable();
            ids.dedup();
            CoveredBlocks { citation_id, review_id, sorted_block_ids: ids }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(block: i64, citation: i64) -> BlockMembership {
        BlockMembership {
            block_id: BlockId(block),
            citation_id: CitationId(citation),
            review_id: ReviewId(3),
        }
    }

    #[test]
    fn block_ids_are_sorted_and_unique() {
        let covered =
            covered_blocks(ReviewId(3), &[member(5, 1), member(2, 1), member(5, 1), member(2, 9)]);
        assert_eq!(covered.len(), 2);
        assert_eq!(covered[0].citation_id, CitationId(1));
        assert_eq!(covered[0].sorted_block_ids, vec![BlockId(2), BlockId(5)]);
        assert_eq!(covered[1].sorted_block_ids, vec![BlockId(2)]);
        assert!(covered.iter().all(|c| c.review_id == ReviewId(3)));
    }

    #[test]
    fn no_memberships_no_rows() {
        assert!(covered_blocks(ReviewId(3), &[]).is_empty());
    }
}
