//! Blocking predicates.
//!
//! A closed set of variants, each mapping a normalized record to zero or more
//! blocking keys. Evaluation is a pure function of the record and the built
//! indices: no dependence on iteration order, no shared mutable state.

mod tfidf;
mod transform;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

pub use tfidf::TfIdfIndex;
pub use transform::StringTransform;

use crate::error::{CoreError, Result};
use crate::normalize::NormalizedRecord;

/// Per-field indices for [`BlockingPredicate::IndexedNearestNeighbor`].
pub type FieldIndices = HashMap<String, TfIdfIndex>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockingPredicate {
    /// Whole canonical field value, exact match.
    ExactField { field: String },

    /// Field viewed as a set of lowercased strings, each transformed into keys.
    TokenSetField { field: String, transform: StringTransform },

    /// TF-IDF canopy over the indexed distinct values of `field`.
    IndexedNearestNeighbor { field: String, threshold: f64 },

    /// Conjunction of predicates: one key per combination of member keys.
    Compound { predicates: Vec<BlockingPredicate> },
}

impl BlockingPredicate {
    /// Fields whose distinct values must be indexed before evaluation.
    pub fn index_fields(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::IndexedNearestNeighbor { field, .. } => {
                out.insert(field.clone());
            },
            Self::Compound { predicates } => predicates.iter().for_each(|p| p.index_fields(out)),
            Self::ExactField { .. } | Self::TokenSetField { .. } => {},
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::ExactField { field } | Self::TokenSetField { field, .. }
                if field.trim().is_empty() =>
            {
                Err(CoreError::InvalidModel("predicate with empty field name".to_owned()))
            },
            Self::TokenSetField { transform, .. } if transform.len_param() == Some(0) => {
                Err(CoreError::InvalidModel(format!("{transform:?} needs a length of at least 1")))
            },
            Self::IndexedNearestNeighbor { threshold, .. }
                if !(threshold.is_finite() && *threshold > 0.0 && *threshold <= 1.0) =>
            {
                Err(CoreError::InvalidModel(format!(
                    "nearest-neighbour threshold {threshold} outside (0, 1]"
                )))
            },
            Self::Compound { predicates } if predicates.is_empty() => {
                Err(CoreError::InvalidModel("compound predicate without members".to_owned()))
            },
            Self::Compound { predicates } => predicates.iter().try_for_each(Self::validate),
            _ => Ok(()),
        }
    }

    /// Keys this predicate emits for `record`. Empty means abstention.
    pub fn emit_keys(
        &self,
        record: &NormalizedRecord,
        indices: &FieldIndices,
    ) -> Result<BTreeSet<String>> {
        match self {
            Self::ExactField { field } => Ok(record.get(field).canonical().into_iter().collect()),
            Self::TokenSetField { field, transform } => {
                let mut keys = BTreeSet::new();
                for s in record.get(field).strings() {
                    transform.apply(&s.to_lowercase(), &mut keys);
                }
                Ok(keys)
            },
            Self::IndexedNearestNeighbor { field, threshold } => {
                let index = indices
                    .get(field)
                    .ok_or_else(|| CoreError::IndexNotBuilt { field: field.clone() })?;
                Ok(index
                    .search(record.get(field), *threshold)
                    .into_iter()
                    .map(|doc| doc.to_string())
                    .collect())
            },
            Self::Compound { predicates } => {
                let mut combined: BTreeSet<String> = BTreeSet::new();
                for (i, predicate) in predicates.iter().enumerate() {
                    let keys = predicate.emit_keys(record, indices)?;
                    if keys.is_empty() {
                        return Ok(BTreeSet::new());
                    }
                    combined = if i == 0 {
                        keys
                    } else {
                        combined
                            .iter()
                            .flat_map(|prefix| keys.iter().map(move |k| format!("{prefix}:{k}")))
                            .collect()
                    };
                }
                Ok(combined)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::normalize::normalize;

    fn exact(field: &str) -> BlockingPredicate {
        BlockingPredicate::ExactField { field: field.to_owned() }
    }

    fn keys(p: &BlockingPredicate, raw: serde_json::Value) -> Vec<String> {
        p.emit_keys(&normalize(&raw), &FieldIndices::new()).unwrap().into_iter().collect()
    }

    #[test]
    fn exact_field_on_single_author_list() {
        assert_eq!(keys(&exact("authors"), json!({ "authors": ["A"] })), vec![r#"["A"]"#]);
    }

    #[test]
    fn missing_field_abstains() {
        assert!(keys(&exact("doi"), json!({ "title": "Cats" })).is_empty());
        let tokens = BlockingPredicate::TokenSetField {
            field: "doi".to_owned(),
            transform: StringTransform::Doi,
        };
        assert!(keys(&tokens, json!({ "doi": null })).is_empty());
    }

    #[test]
    fn token_set_field_lowercases_each_element() {
        let p = BlockingPredicate::TokenSetField {
            field: "authors".to_owned(),
            transform: StringTransform::Whole,
        };
        assert_eq!(keys(&p, json!({ "authors": ["Smith J", "DOE A"] })), vec!["doe a", "smith j"]);
    }

    #[test]
    fn compound_takes_the_cartesian_product() {
        let p = BlockingPredicate::Compound {
            predicates: vec![
                exact("publication_year"),
                BlockingPredicate::TokenSetField {
                    field: "title".to_owned(),
                    transform: StringTransform::Tokens,
                },
            ],
        };
        assert_eq!(keys(&p, json!({ "publication_year": 2001, "title": "Cats Dogs" })), vec![
            "2001:cats",
            "2001:dogs"
        ]);
    }

    #[test]
    fn compound_abstains_when_any_member_abstains() {
        let p = BlockingPredicate::Compound { predicates: vec![exact("title"), exact("doi")] };
        assert!(keys(&p, json!({ "title": "Cats" })).is_empty());
    }

    #[test]
    fn unindexed_nearest_neighbor_is_an_error() {
        let p = BlockingPredicate::IndexedNearestNeighbor {
            field: "title".to_owned(),
            threshold: 0.8,
        };
        let err = p.emit_keys(&normalize(&json!({ "title": "Cats" })), &FieldIndices::new());
        assert!(matches!(err, Err(CoreError::IndexNotBuilt { field }) if field == "title"));
    }

    #[test]
    fn indexed_nearest_neighbor_abstains_on_missing_field() {
        let p = BlockingPredicate::IndexedNearestNeighbor {
            field: "abstract".to_owned(),
            threshold: 0.8,
        };
        let mut indices = FieldIndices::new();
        let value = crate::normalize::FieldValue::Text("some abstract".to_owned());
        indices.insert("abstract".to_owned(), TfIdfIndex::build([value].iter()));
        assert!(keys_with(&p, json!({ "title": "Cats" }), &indices).is_empty());
    }

    fn keys_with(p: &BlockingPredicate, raw: serde_json::Value, idx: &FieldIndices) -> Vec<String> {
        p.emit_keys(&normalize(&raw), idx).unwrap().into_iter().collect()
    }

    #[test]
    fn validation_rejects_degenerate_predicates() {
        let zero_len = BlockingPredicate::TokenSetField {
            field: "title".to_owned(),
            transform: StringTransform::Ngrams { len: 0 },
        };
        assert!(zero_len.validate().is_err());
        let bad_threshold = BlockingPredicate::IndexedNearestNeighbor {
            field: "title".to_owned(),
            threshold: 1.5,
        };
        assert!(bad_threshold.validate().is_err());
        assert!(BlockingPredicate::Compound { predicates: vec![] }.validate().is_err());
        assert!(exact(" ").validate().is_err());
        assert!(exact("title").validate().is_ok());
    }

    #[test]
    fn index_fields_walk_compounds() {
        let p = BlockingPredicate::Compound {
            predicates: vec![exact("doi"), BlockingPredicate::IndexedNearestNeighbor {
                field: "title".to_owned(),
                threshold: 0.6,
            }],
        };
        let mut fields = BTreeSet::new();
        p.index_fields(&mut fields);
        assert_eq!(fields.into_iter().collect::<Vec<_>>(), vec!["title"]);
    }
}
