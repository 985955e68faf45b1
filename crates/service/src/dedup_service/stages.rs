//! The CPU stages of a run, each on the blocking pool.
//!
//! Stages hand the partially built index from one to the next by value; none
//! of them can start before the previous one has fully materialized.

use citeblock_core::blocking::{BlockAssignment, BlockBuilder, covered_blocks, smaller_coverage};
use citeblock_core::normalize::NormalizedRecord;
use citeblock_core::pipeline::{emit_blocking_map, index_blocker, normalize_records};
use citeblock_core::{Blocker, BlockingModel, CitationId, CitationRecord, DedupeIndex, ReviewId};

use crate::ServiceError;

pub(super) struct Indexed {
    blocker: Blocker,
    records: Vec<(CitationId, NormalizedRecord)>,
}

/// Normalize every record and build the index structures of index predicates.
pub(super) async fn index(
    model: BlockingModel,
    records: Vec<CitationRecord>,
) -> Result<Indexed, ServiceError> {
    Ok(tokio::task::spawn_blocking(move || {
        let records = normalize_records(&records);
        let mut blocker = Blocker::new(model);
        index_blocker(&mut blocker, &records);
        Indexed { blocker, records }
    })
    .await?)
}

/// Evaluate predicates and group emissions into plural blocks.
pub(super) async fn block(
    review_id: ReviewId,
    indexed: Indexed,
    shards: usize,
) -> Result<DedupeIndex, ServiceError> {
    tokio::task::spawn_blocking(move || -> Result<DedupeIndex, ServiceError> {
        let blocking_map = emit_blocking_map(review_id, &indexed.blocker, &indexed.records)?;
        let BlockAssignment { blocks, memberships } =
            BlockBuilder::new(review_id).with_shards(shards).build(&blocking_map);
        Ok(DedupeIndex { blocking_map, blocks, memberships, ..DedupeIndex::empty(review_id) })
    })
    .await?
}

pub(super) async fn cover(mut index: DedupeIndex) -> Result<DedupeIndex, ServiceError> {
    Ok(tokio::task::spawn_blocking(move || {
        index.covered = covered_blocks(index.review_id, &index.memberships);
        index
    })
    .await?)
}

pub(super) async fn partition(mut index: DedupeIndex) -> Result<DedupeIndex, ServiceError> {
    Ok(tokio::task::spawn_blocking(move || {
        index.smaller = smaller_coverage(index.review_id, &index.memberships, &index.covered);
        index
    })
    .await?)
}
