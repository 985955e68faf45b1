use std::collections::HashMap;

use rayon::prelude::*;

use super::{BlockMembership, CoveredBlocks, SmallerCoverage};
use crate::ids::{BlockId, CitationId, ReviewId};

/// The prefix of `sorted` strictly below `block_id`.
#[must_use]
pub fn smaller_ids(sorted: &[BlockId], block_id: BlockId) -> Vec<BlockId> {
    let end = sorted.partition_point(|id| *id < block_id);
    sorted[..end].to_vec()
}

/// One row per membership: the member's covered blocks with a smaller id.
///
/// Memberships whose citation has no covered-blocks row are skipped; that only
/// happens when the inputs come from different runs. Output is ordered by
/// `(citation_id, block_id)`.
#[must_use]
pub fn smaller_coverage(
    review_id: ReviewId,
    memberships: &[BlockMembership],
    covered: &[CoveredBlocks],
) -> Vec<SmallerCoverage> {
    let by_citation: HashMap<CitationId, &[BlockId]> =
        covered.iter().map(|c| (c.citation_id, c.sorted_block_ids.as_slice())).collect();

    let mut rows: Vec<SmallerCoverage> = memberships
        .par_iter()
        .filter_map(|m| {
            let sorted = by_citation.get(&m.citation_id)?;
            Some(SmallerCoverage {
                citation_id: m.citation_id,
                review_id,
                block_id: m.block_id,
                smaller_ids: smaller_ids(sorted, m.block_id),
            })
        })
        .collect();
    rows.par_sort_unstable_by_key(|r| (r.citation_id, r.block_id));
    rows
}
