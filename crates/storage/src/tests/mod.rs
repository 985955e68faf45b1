//! Test utilities and module declarations for storage tests.

use chrono::{Duration, Utc};
use citeblock_core::{CitationId, NewCitation, ReviewId};

use crate::MemoryStorage;
use crate::traits::CitationStore;

pub fn cats_and_dogs() -> Vec<NewCitation> {
    vec![
        NewCitation::new("Cats").authors(["A"]),
        NewCitation::new("Cats").authors(["B"]),
        NewCitation::new("Dogs").authors(["A"]),
    ]
}

/// Fresh store holding `citations` in `review`, created well before now.
#[expect(clippy::unwrap_used, reason = "test code")]
pub async fn seeded(review: ReviewId, citations: Vec<NewCitation>) -> (MemoryStorage, Vec<CitationId>) {
    let storage = MemoryStorage::new();
    let past = Utc::now() - Duration::minutes(10);
    let citations: Vec<_> = citations.into_iter().map(|c| c.created_at(past)).collect();
    let ids = storage.insert_citations(review, &citations).await.unwrap();
    (storage, ids)
}

mod backend_tests;
