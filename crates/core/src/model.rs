//! Trained blocking model: loading and evaluation.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blocking::BlockingKey;
use crate::error::{CoreError, Result};
use crate::normalize::{FieldValue, NormalizedRecord};
use crate::predicate::{BlockingPredicate, FieldIndices, TfIdfIndex};

/// Position of a predicate in the model's predicate list.
pub type PredicateId = usize;

/// A previously fit blocking-predicate set.
///
/// Other top-level keys of the settings document (pairwise feature weights
/// and the like) belong to the downstream scorer and are ignored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingModel {
    pub predicates: Vec<BlockingPredicate>,
}

impl BlockingModel {
    /// Load the model from a JSON settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| CoreError::ModelUnavailable { path: path.to_path_buf(), source })?;
        let model = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            predicates = model.predicates.len(),
            "blocking model loaded"
        );
        Ok(model)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(raw)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.predicates.is_empty() {
            return Err(CoreError::InvalidModel("model has no predicates".to_owned()));
        }
        self.predicates.iter().try_for_each(BlockingPredicate::validate)
    }

    /// Fields that need an `index()` pass before records can be blocked.
    #[must_use]
    pub fn index_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        for predicate in &self.predicates {
            predicate.index_fields(&mut fields);
        }
        fields
    }
}

/// Applies a trained model to normalized records.
///
/// `index` must run for every field in [`Blocker::index_fields`] before the
/// first call to [`Blocker::block_keys`]; afterwards the blocker is read-only
/// and can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct Blocker {
    model: BlockingModel,
    indices: FieldIndices,
}

impl Blocker {
    #[must_use]
    pub fn new(model: BlockingModel) -> Self {
        Self { model, indices: FieldIndices::new() }
    }

    #[must_use]
    pub fn index_fields(&self) -> BTreeSet<String> {
        self.model.index_fields()
    }

    /// Build the index for `field` from every distinct value it takes in the
    /// review. Re-indexing a field replaces the previous index.
    pub fn index<'a, I>(&mut self, field_values: I, field: &str)
    where
        I: IntoIterator<Item = &'a FieldValue>,
    {
        let index = TfIdfIndex::build(field_values);
        tracing::debug!(field, docs = index.doc_count(), "index predicate field indexed");
        self.indices.insert(field.to_owned(), index);
    }

    /// Every `(key, predicate_id)` the record satisfies.
    pub fn block_keys(&self, record: &NormalizedRecord) -> Result<BTreeSet<(String, PredicateId)>> {
        let mut out = BTreeSet::new();
        for (predicate_id, predicate) in self.model.predicates.iter().enumerate() {
            for key in predicate.emit_keys(record, &self.indices)? {
                out.insert((key, predicate_id));
            }
        }
        Ok(out)
    }

    /// [`Blocker::block_keys`] rendered as persisted blocking keys.
    pub fn blocking_keys(&self, record: &NormalizedRecord) -> Result<BTreeSet<BlockingKey>> {
        Ok(self
            .block_keys(record)?
            .into_iter()
            .map(|(key, predicate_id)| BlockingKey::new(&key, predicate_id))
            .collect())
    }
}
