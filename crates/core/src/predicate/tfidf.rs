//! TF-IDF cosine index backing nearest-neighbour predicates.
//!
//! Built once per field over every distinct value of that field in the review.
//! Each distinct value becomes one document; a record's keys are the ids of the
//! documents whose cosine similarity to the record's value reaches the
//! predicate threshold (a canopy). Document ids follow the sorted order of the
//! distinct token bags, so the same value set always yields the same ids.
//!
//! Tokens present in more than [`stop_word_cap`] documents are stop words:
//! they are left out of the postings and of every weight vector, so a query
//! only walks short posting lists.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::normalize::FieldValue;
use crate::predicate::transform::tokens;

/// Slack for floating-point comparisons against the threshold.
const SCORE_EPSILON: f64 = 1e-9;

/// Document frequency above which a token never narrows a canopy.
const MIN_STOP_WORD_DF: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct TfIdfIndex {
    doc_count: usize,
    idf: HashMap<String, f64>,
    stop_words: HashSet<String>,
    postings: HashMap<String, Vec<(usize, f64)>>,
}

/// `max(500, 2.5% of the documents)`.
fn stop_word_cap(doc_count: usize) -> usize {
    MIN_STOP_WORD_DF.max(doc_count.div_ceil(40))
}

impl TfIdfIndex {
    /// Build the index from the distinct values of one field.
    pub fn build<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a FieldValue>,
    {
        let docs: BTreeSet<Vec<String>> = values
            .into_iter()
            .map(token_bag)
            .filter(|bag| !bag.is_empty())
            .collect();
        let doc_count = docs.len();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &docs {
            let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
            for token in unique {
                *df.entry(token).or_default() += 1;
            }
        }
        let cap = stop_word_cap(doc_count);
        let stop_words: HashSet<String> =
            df.iter().filter(|(_, n)| **n > cap).map(|(t, _)| (*t).to_owned()).collect();
        let idf: HashMap<String, f64> = df
            .iter()
            .filter(|(_, n)| **n <= cap)
            .map(|(t, n)| ((*t).to_owned(), smoothed_idf(doc_count, *n)))
            .collect();

        let mut postings: HashMap<String, Vec<(usize, f64)>> = HashMap::new();
        for (doc_id, doc) in docs.iter().enumerate() {
            // a document made only of stop words has no weights and is never a hit
            for (token, weight) in weighted(doc, |t| idf.get(t).copied().unwrap_or(0.0)) {
                postings.entry(token).or_default().push((doc_id, weight));
            }
        }

        tracing::debug!(
            docs = doc_count,
            vocabulary = idf.len(),
            stop_words = stop_words.len(),
            "tf-idf index built"
        );
        Self { doc_count, idf, stop_words, postings }
    }

    #[must_use]
    pub const fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Ids of indexed documents with cosine similarity `>= threshold`, ascending.
    #[must_use]
    pub fn search(&self, value: &FieldValue, threshold: f64) -> Vec<usize> {
        let bag = token_bag(value);
        if bag.is_empty() || self.doc_count == 0 {
            return Vec::new();
        }
        let unseen = smoothed_idf(self.doc_count, 0);
        let query = weighted(&bag, |t| {
            if self.stop_words.contains(t) {
                0.0
            } else {
                self.idf.get(t).copied().unwrap_or(unseen)
            }
        });

        let mut scores: HashMap<usize, f64> = HashMap::new();
        for (token, q_weight) in &query {
            if let Some(list) = self.postings.get(token) {
                for (doc_id, d_weight) in list {
                    *scores.entry(*doc_id).or_default() += q_weight * d_weight;
                }
            }
        }
        let mut hits: Vec<usize> = scores
            .into_iter()
            .filter(|(_, score)| *score + SCORE_EPSILON >= threshold)
            .map(|(doc_id, _)| doc_id)
            .collect();
        hits.sort_unstable();
        hits
    }
}

/// Lowercased tokens of a value, sorted, multiplicity kept.
///
/// Text is split into words; a sequence contributes each element whole, so a
/// list of author names is compared as a set of names.
fn token_bag(value: &FieldValue) -> Vec<String> {
    let mut bag: Vec<String> = match value {
        FieldValue::Seq(_) => value.strings().into_iter().map(|s| s.to_lowercase()).collect(),
        _ => value
            .strings()
            .iter()
            .flat_map(|s| tokens(&s.to_lowercase()).map(str::to_owned).collect::<Vec<_>>())
            .collect(),
    };
    bag.sort();
    bag
}

fn smoothed_idf(doc_count: usize, df: usize) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "document counts are far below 2^52")]
    let (n, df) = (doc_count as f64, df as f64);
    ((1.0 + n) / (1.0 + df)).ln() + 1.0
}

/// L2-normalized tf·idf weights of a sorted token bag, in token order.
///
/// Tokens weighted zero (stop words) are dropped before normalizing.
fn weighted<F>(bag: &[String], idf: F) -> Vec<(String, f64)>
where
    F: Fn(&str) -> f64,
{
    let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
    for token in bag {
        *counts.entry(token.as_str()).or_default() += 1.0;
    }
    let raw: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(t, tf)| (t.to_owned(), tf * idf(t)))
        .filter(|(_, w)| *w > 0.0)
        .collect();
    let norm = raw.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm == 0.0 {
        return Vec::new();
    }
    raw.into_iter().map(|(t, w)| (t, w / norm)).collect()
}
