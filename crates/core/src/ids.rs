//! Identifier newtypes.
//!
//! Review, citation and block ids are all plain integers in storage; wrapping
//! them prevents passing a citation id where a block id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Review (project) that owns a set of citations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-types", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct ReviewId(pub i32);

/// Stable citation record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-types", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct CitationId(pub i64);

/// Surrogate id of a plural block.
///
/// Only meaningful within one dedup run of one review; never persist it as a
/// reference that must survive a re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-types", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct BlockId(pub i64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
