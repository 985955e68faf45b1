use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use serde_json::json;

use super::*;
use crate::model::{Blocker, BlockingModel};
use crate::normalize::normalize;

const REVIEW: ReviewId = ReviewId(7);

fn title_and_author() -> Blocker {
    Blocker::new(
        BlockingModel::from_json(
            r#"{ "predicates": [
                { "type": "exact_field", "field": "title" },
                { "type": "exact_field", "field": "authors" }
            ] }"#,
        )
        .unwrap(),
    )
}

fn emissions_for(blocker: &Blocker, records: &[(i64, serde_json::Value)]) -> Vec<BlockingMapEntry> {
    let mut out = Vec::new();
    for (id, raw) in records {
        for block_key in blocker.blocking_keys(&normalize(raw)).unwrap() {
            out.push(BlockingMapEntry { citation_id: CitationId(*id), review_id: REVIEW, block_key });
        }
    }
    out
}

fn emit(citation: i64, key: &str) -> BlockingMapEntry {
    BlockingMapEntry {
        citation_id: CitationId(citation),
        review_id: REVIEW,
        block_key: BlockingKey::new(key, 0),
    }
}

#[test]
fn cats_and_dogs() {
    let records = [
        (1, json!({ "title": "Cats", "authors": ["A"] })),
        (2, json!({ "title": "Cats", "authors": ["B"] })),
        (3, json!({ "title": "Dogs", "authors": ["A"] })),
    ];
    let index = DedupeIndex::from_emissions(REVIEW, emissions_for(&title_and_author(), &records), 4);

    assert_eq!(index.blocking_map.len(), 6);
    let keys: BTreeSet<_> = index.blocks.iter().map(|b| b.block_key.as_str()).collect();
    assert_eq!(keys, BTreeSet::from(["Cats:0", r#"["A"]:1"#]));
    assert_eq!(index.memberships.len(), 4);

    let pairs: BTreeSet<_> = index.candidate_pairs().iter().map(|p| (p.first.0, p.second.0)).collect();
    assert_eq!(pairs, BTreeSet::from([(1, 2), (1, 3)]));
    assert_eq!(index.candidate_pairs().len(), 2);
}

#[test]
fn single_record_builds_an_empty_index() {
    let records = [(1, json!({ "title": "Cats", "authors": ["A"] }))];
    let index = DedupeIndex::from_emissions(REVIEW, emissions_for(&title_and_author(), &records), 1);
    let stats = index.stats();
    assert_eq!(stats.blocking_keys, 2);
    assert_eq!((stats.blocks, stats.memberships, stats.smaller_coverage_rows), (0, 0, 0));
    assert!(index.candidate_pairs().is_empty());
}

#[test]
fn pair_sharing_two_blocks_is_reported_at_the_smaller() {
    let index = DedupeIndex::from_emissions(
        REVIEW,
        vec![emit(1, "x"), emit(2, "x"), emit(1, "y"), emit(2, "y"), emit(3, "y")],
        2,
    );
    let pairs = index.candidate_pairs();
    assert_eq!(pairs.len(), 3);
    let x = index.blocks.iter().find(|b| b.block_key == BlockingKey::new("x", 0)).unwrap();
    assert!(pairs.contains(&CandidatePair {
        first: CitationId(1),
        second: CitationId(2),
        block_id: x.block_id,
    }));
}

#[test]
fn empty_index_has_zero_stats() {
    assert_eq!(DedupeIndex::empty(REVIEW).stats(), IndexStats::default());
}

fn emissions_strategy() -> impl Strategy<Value = Vec<BlockingMapEntry>> {
    prop::collection::vec((1i64..25, 0u8..12), 0..120).prop_map(|raw| {
        raw.into_iter().map(|(citation, key)| emit(citation, &format!("k{key}"))).collect()
    })
}

/// Reference: all pairs sharing a plural key, keyed to their smallest shared block.
fn brute_force_pairs(index: &DedupeIndex) -> BTreeMap<(CitationId, CitationId), BlockId> {
    let mut members: BTreeMap<BlockId, Vec<CitationId>> = BTreeMap::new();
    for m in &index.memberships {
        members.entry(m.block_id).or_default().push(m.citation_id);
    }
    let mut out = BTreeMap::new();
    for (block, mut ids) in members {
        ids.sort_unstable();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                out.entry((*a, *b)).or_insert(block);
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn only_plural_blocks_survive(emissions in emissions_strategy()) {
        let index = DedupeIndex::from_emissions(REVIEW, emissions, 3);
        let mut per_block: BTreeMap<BlockId, BTreeSet<CitationId>> = BTreeMap::new();
        for m in &index.memberships {
            per_block.entry(m.block_id).or_default().insert(m.citation_id);
        }
        prop_assert_eq!(per_block.len(), index.blocks.len());
        prop_assert!(per_block.values().all(|members| members.len() >= 2));
    }

    #[test]
    fn coverage_matches_memberships(emissions in emissions_strategy()) {
        let index = DedupeIndex::from_emissions(REVIEW, emissions, 3);
        let member_count: usize = index.covered.iter().map(|c| c.sorted_block_ids.len()).sum();
        prop_assert_eq!(member_count, index.memberships.len());
        prop_assert_eq!(index.smaller.len(), index.memberships.len());
        for c in &index.covered {
            prop_assert!(c.sorted_block_ids.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn smaller_ids_are_the_prefix_below_the_block(emissions in emissions_strategy()) {
        let index = DedupeIndex::from_emissions(REVIEW, emissions, 3);
        let covered: BTreeMap<_, _> =
            index.covered.iter().map(|c| (c.citation_id, &c.sorted_block_ids)).collect();
        for row in &index.smaller {
            let expected: Vec<BlockId> =
                covered[&row.citation_id].iter().copied().filter(|id| *id < row.block_id).collect();
            prop_assert_eq!(&row.smaller_ids, &expected);
        }
    }

    #[test]
    fn every_sharing_pair_once_at_its_smallest_block(emissions in emissions_strategy()) {
        let index = DedupeIndex::from_emissions(REVIEW, emissions, 3);
        let pairs = index.candidate_pairs();
        let found: BTreeMap<_, _> = pairs.iter().map(|p| ((p.first, p.second), p.block_id)).collect();
        prop_assert_eq!(found.len(), pairs.len());
        prop_assert!(pairs.iter().all(|p| p.first < p.second));
        prop_assert_eq!(found, brute_force_pairs(&index));
    }

    #[test]
    fn shard_count_does_not_change_the_index(emissions in emissions_strategy(), shards in 1usize..9) {
        let one = DedupeIndex::from_emissions(REVIEW, emissions.clone(), 1);
        let many = DedupeIndex::from_emissions(REVIEW, emissions, shards);
        prop_assert_eq!(one, many);
    }

    #[test]
    fn rebuilding_is_idempotent(emissions in emissions_strategy()) {
        let first = DedupeIndex::from_emissions(REVIEW, emissions.clone(), 2);
        let second = DedupeIndex::from_emissions(REVIEW, emissions, 2);
        prop_assert_eq!(first.candidate_pairs(), second.candidate_pairs());
        prop_assert_eq!(first, second);
    }
}
