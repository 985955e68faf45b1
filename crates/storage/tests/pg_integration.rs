//! Integration tests for PgStorage.
//! Run with: DATABASE_URL=... cargo test -p citeblock-storage -- --ignored pg_

#![allow(clippy::unwrap_used, reason = "integration test code")]

use chrono::{Duration, Utc};
use citeblock_core::{
    BlockingKey, BlockingMapEntry, CitationId, DedupeIndex, DedupeStatus, IndexStats, NewCitation,
    ReviewId,
};
use citeblock_storage::{CitationStore, DedupeIndexStore, PgStorage};
use uuid::Uuid;

async fn create_pg_storage() -> PgStorage {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for PgStorage integration tests");
    PgStorage::new(&url).await.expect("Failed to connect to PostgreSQL")
}

/// A review id no other test run uses.
fn unique_review() -> ReviewId {
    let raw = Uuid::new_v4().as_u128() % 1_000_000_000;
    ReviewId(i32::try_from(raw).unwrap() + 1)
}

async fn seed_cats_and_dogs(storage: &PgStorage, review: ReviewId) -> Vec<CitationId> {
    let past = Utc::now() - Duration::minutes(5);
    storage
        .insert_citations(review, &[
            NewCitation::new("Cats").authors(["A"]).publication_year(2001).created_at(past),
            NewCitation::new("Cats").authors(["B"]).created_at(past),
            NewCitation::new("Dogs").authors(["A"]).doi("10.1000/xyz").created_at(past),
        ])
        .await
        .unwrap()
}

fn cats_and_dogs_index(review: ReviewId, ids: &[CitationId]) -> DedupeIndex {
    let emit = |id: CitationId, key: &str, predicate: usize| BlockingMapEntry {
        citation_id: id,
        review_id: review,
        block_key: BlockingKey::new(key, predicate),
    };
    DedupeIndex::from_emissions(
        review,
        vec![
            emit(ids[0], "Cats", 0),
            emit(ids[1], "Cats", 0),
            emit(ids[2], "Dogs", 0),
            emit(ids[0], "A", 1),
            emit(ids[1], "B", 1),
            emit(ids[2], "A", 1),
        ],
        1,
    )
}

#[tokio::test]
#[ignore]
async fn pg_citations_round_trip() {
    let storage = create_pg_storage().await;
    let review = unique_review();
    let ids = seed_cats_and_dogs(&storage, review).await;

    let records = storage.get_citations(review).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id, ids[0]);
    assert_eq!(records[0].publication_year, Some(2001));
    assert_eq!(records[2].doi.as_deref(), Some("10.1000/xyz"));
    assert_eq!(storage.count_citations(review).await.unwrap(), 3);
    assert!(storage.has_undeduplicated(review).await.unwrap());
    assert!(storage.eligible_review_ids().await.unwrap().contains(&review));
    assert!(storage.latest_citation_created_at(review).await.unwrap().is_some());
}

#[tokio::test]
#[ignore]
async fn pg_replace_index_and_query_pairs() {
    let storage = create_pg_storage().await;
    let review = unique_review();
    let ids = seed_cats_and_dogs(&storage, review).await;
    let index = cats_and_dogs_index(review, &ids);

    let stats = storage.replace_dedupe_index(&index).await.unwrap();
    assert_eq!(storage.get_index_stats(review).await.unwrap(), stats);
    assert_eq!(storage.get_smaller_coverage(review).await.unwrap(), index.smaller);
    assert_eq!(storage.get_covered_blocks(review).await.unwrap(), index.covered);

    let pairs = storage.get_candidate_pairs(review).await.unwrap();
    assert_eq!(pairs, index.candidate_pairs());
    assert_eq!(pairs.len(), 2);

    storage.set_dedupe_status(ids[1], DedupeStatus::Duplicate).await.unwrap();
    let pairs = storage.get_candidate_pairs(review).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].first, pairs[0].second), (ids[0], ids[2]));
}

#[tokio::test]
#[ignore]
async fn pg_replace_is_a_full_swap() {
    let storage = create_pg_storage().await;
    let review = unique_review();
    let ids = seed_cats_and_dogs(&storage, review).await;

    storage.replace_dedupe_index(&cats_and_dogs_index(review, &ids)).await.unwrap();
    storage.replace_dedupe_index(&cats_and_dogs_index(review, &ids)).await.unwrap();
    assert_eq!(storage.get_index_stats(review).await.unwrap().memberships, 4);

    storage.replace_dedupe_index(&DedupeIndex::empty(review)).await.unwrap();
    assert_eq!(storage.get_index_stats(review).await.unwrap(), IndexStats::default());
}

#[tokio::test]
#[ignore]
async fn pg_clear_is_scoped_to_the_review() {
    let storage = create_pg_storage().await;
    let (a, b) = (unique_review(), unique_review());
    let ids_a = seed_cats_and_dogs(&storage, a).await;
    let ids_b = seed_cats_and_dogs(&storage, b).await;
    storage.replace_dedupe_index(&cats_and_dogs_index(a, &ids_a)).await.unwrap();
    storage.replace_dedupe_index(&cats_and_dogs_index(b, &ids_b)).await.unwrap();

    storage.clear_dedupe_index(a).await.unwrap();
    assert_eq!(storage.get_index_stats(a).await.unwrap(), IndexStats::default());
    assert_eq!(storage.get_index_stats(b).await.unwrap().blocks, 2);
}
