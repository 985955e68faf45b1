//! CPU stages of a dedup run, from stored citations to blocking-map rows.
//!
//! All functions here are synchronous and parallelised with rayon; callers on
//! an async runtime run them inside `spawn_blocking`.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::blocking::BlockingMapEntry;
use crate::citation::CitationRecord;
use crate::error::Result;
use crate::ids::{CitationId, ReviewId};
use crate::model::Blocker;
use crate::normalize::{FieldValue, NormalizedRecord, normalize};

/// Normalize every record, keeping its id alongside.
#[must_use]
pub fn normalize_records(records: &[CitationRecord]) -> Vec<(CitationId, NormalizedRecord)> {
    records.par_iter().map(|r| (r.id, normalize(&r.to_raw()))).collect()
}

/// Distinct non-empty values of `field` across the review.
#[must_use]
pub fn distinct_values<'a>(
    records: &'a [(CitationId, NormalizedRecord)],
    field: &str,
) -> BTreeSet<&'a FieldValue> {
    records.iter().map(|(_, r)| r.get(field)).filter(|v| !v.is_empty()).collect()
}

/// Run the index pre-pass for every field the blocker's predicates index on.
pub fn index_blocker(blocker: &mut Blocker, records: &[(CitationId, NormalizedRecord)]) {
    for field in blocker.index_fields() {
        let values = distinct_values(records, &field);
        blocker.index(values, &field);
    }
}

/// Evaluate every predicate on every record.
///
/// Output is sorted by `(citation_id, block_key)` and free of duplicates.
pub fn emit_blocking_map(
    review_id: ReviewId,
    blocker: &Blocker,
    records: &[(CitationId, NormalizedRecord)],
) -> Result<Vec<BlockingMapEntry>> {
    let per_record: Vec<Vec<BlockingMapEntry>> = records
        .par_iter()
        .map(|(citation_id, record)| -> Result<Vec<BlockingMapEntry>> {
            Ok(blocker
                .blocking_keys(record)?
                .into_iter()
                .map(|block_key| BlockingMapEntry {
                    citation_id: *citation_id,
                    review_id,
                    block_key,
                })
                .collect())
        })
        .collect::<Result<_>>()?;

    let mut entries: Vec<BlockingMapEntry> = per_record.into_iter().flatten().collect();
    entries.par_sort_unstable();
    entries.dedup();
    Ok(entries)
}
