//! Core types and algorithms for citeblock
//!
//! Record normalization, the trained blocking model and the block index.
//! Nothing in this crate does I/O beyond reading the model file.

pub mod blocking;
mod citation;
pub mod constants;
pub mod env_config;
mod error;
mod ids;
mod model;
pub mod normalize;
pub mod pipeline;
pub mod predicate;

pub use blocking::{
    Block, BlockMembership, BlockingKey, BlockingMapEntry, CandidateBlock, CandidateMember,
    CandidatePair, CoveredBlocks, DedupeIndex, IndexStats, SmallerCoverage,
};
pub use citation::*;
pub use constants::*;
pub use error::*;
pub use ids::*;
pub use model::*;
