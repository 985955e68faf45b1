use std::collections::{BTreeMap, BTreeSet};
use std::hash::{DefaultHasher, Hash, Hasher};

use rayon::prelude::*;

use super::{Block, BlockMembership, BlockingKey, BlockingMapEntry};
use crate::ids::{BlockId, CitationId, ReviewId};

/// Output of the block builder: plural blocks and their memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockAssignment {
    pub blocks: Vec<Block>,
    pub memberships: Vec<BlockMembership>,
}

/// Groups emissions by key, drops singleton keys and assigns block ids.
///
/// Grouping is sharded by key hash; shards are reduced in parallel and merged.
/// Block ids are assigned from 1 in ascending key order, so the same emissions
/// always produce the same ids regardless of the shard count.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    review_id: ReviewId,
    shards: usize,
}

impl BlockBuilder {
    #[must_use]
    pub const fn new(review_id: ReviewId) -> Self {
        Self { review_id, shards: 1 }
    }

    #[must_use]
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards.max(1);
        self
    }

    #[must_use]
    pub fn build(&self, emissions: &[BlockingMapEntry]) -> BlockAssignment {
        let mut shards: Vec<Vec<&BlockingMapEntry>> = vec![Vec::new(); self.shards];
        for entry in emissions {
            shards[shard_of(&entry.block_key, self.shards)].push(entry);
        }

        let mut plural: Vec<(&BlockingKey, BTreeSet<CitationId>)> = shards
            .into_par_iter()
            .flat_map_iter(|shard| {
                let mut groups: BTreeMap<&BlockingKey, BTreeSet<CitationId>> = BTreeMap::new();
                for entry in shard {
                    groups.entry(&entry.block_key).or_default().insert(entry.citation_id);
                }
                groups.into_iter().filter(|(_, members)| members.len() > 1)
            })
            .collect();
        plural.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut blocks = Vec::with_capacity(plural.len());
        let mut memberships = Vec::new();
        for (next_id, (key, members)) in (1_i64..).zip(plural) {
            let block_id = BlockId(next_id);
            blocks.push(Block { block_id, review_id: self.review_id, block_key: key.clone() });
            memberships.extend(members.into_iter().map(|citation_id| BlockMembership {
                block_id,
                citation_id,
                review_id: self.review_id,
            }));
        }

        tracing::debug!(
            review_id = %self.review_id,
            emissions = emissions.len(),
            blocks = blocks.len(),
            memberships = memberships.len(),
            "plural blocks assigned"
        );
        BlockAssignment { blocks, memberships }
    }
}

fn shard_of(key: &BlockingKey, shards: usize) -> usize {
    if shards == 1 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    #[allow(clippy::cast_possible_truncation, reason = "reduced modulo the shard count")]
    let shard = (hasher.finish() % shards as u64) as usize;
    shard
}
