#![expect(clippy::unwrap_used, reason = "test code")]

use citeblock_core::{BlockingKey, BlockingMapEntry, CandidatePair, DedupeIndex, ReviewId};

use super::cats_and_dogs;
use crate::StorageBackend;
use crate::traits::{CitationStore, DedupeIndexStore};

#[tokio::test]
async fn memory_backend_dispatches_both_traits() {
    let storage = StorageBackend::new_memory();
    assert_eq!(storage.kind(), "memory");

    let review = ReviewId(5);
    let ids = storage.insert_citations(review, &cats_and_dogs()).await.unwrap();
    assert_eq!(storage.count_citations(review).await.unwrap(), 3);
    assert!(storage.has_undeduplicated(review).await.unwrap());

    let entry = |i: usize, key: &str| BlockingMapEntry {
        citation_id: ids[i],
        review_id: review,
        block_key: BlockingKey::new(key, 0),
    };
    let index = DedupeIndex::from_emissions(
        review,
        vec![entry(0, "Cats"), entry(1, "Cats"), entry(2, "Dogs")],
        1,
    );
    storage.replace_dedupe_index(&index).await.unwrap();

    let pairs = storage.get_candidate_pairs(review).await.unwrap();
    assert_eq!(pairs.len(), 1);
    let CandidatePair { first, second, .. } = pairs[0];
    assert_eq!((first, second), (ids[0], ids[1]));

    storage.clear_dedupe_index(review).await.unwrap();
    assert_eq!(storage.get_index_stats(review).await.unwrap().blocks, 0);
}
