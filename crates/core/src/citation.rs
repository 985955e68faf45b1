use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CitationId, ReviewId};

/// Immutable projection of a stored citation, read at dedup-run time.
///
/// Only the fields the trained blocking predicates may reference are carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub id: CitationId,
    pub review_id: ReviewId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub doi: Option<String>,
}

impl CitationRecord {
    /// Field map as read from storage, the input of the record normalizer.
    ///
    /// `id` and `review_id` are omitted: predicates never block on them.
    #[must_use]
    pub fn to_raw(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "authors": self.authors,
            "abstract": self.abstract_text,
            "publication_year": self.publication_year,
            "doi": self.doi,
        })
    }
}

/// A citation to be inserted into a review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCitation {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub doi: Option<String>,
    /// Defaults to the insertion time when absent.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewCitation {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    #[must_use]
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn publication_year(mut self, year: i32) -> Self {
        self.publication_year = Some(year);
        self
    }

    #[must_use]
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    #[must_use]
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    #[must_use]
    pub const fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Resolution state of a citation with respect to deduplication.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DedupeStatus {
    /// Not yet examined by a dedup run; makes its review eligible.
    #[default]
    Unresolved,
    NotDuplicate,
    Duplicate,
}

impl DedupeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::NotDuplicate => "not_duplicate",
            Self::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for DedupeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DedupeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unresolved" => Ok(Self::Unresolved),
            "not_duplicate" => Ok(Self::NotDuplicate),
            "duplicate" => Ok(Self::Duplicate),
            _ => Err(format!("invalid dedupe status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_projection_uses_storage_field_names() {
        let record = CitationRecord {
            id: CitationId(7),
            review_id: ReviewId(1),
            title: "Cats".to_owned(),
            authors: vec!["A".to_owned(), "B".to_owned()],
            abstract_text: None,
            publication_year: Some(2019),
            doi: Some("10.1/x".to_owned()),
        };
        let raw = record.to_raw();
        assert_eq!(raw["title"], "Cats");
        assert_eq!(raw["authors"], serde_json::json!(["A", "B"]));
        assert!(raw["abstract"].is_null());
        assert_eq!(raw["publication_year"], 2019);
        assert!(raw.get("id").is_none());
    }

    #[test]
    fn dedupe_status_round_trips_through_text() {
        for status in [DedupeStatus::Unresolved, DedupeStatus::NotDuplicate, DedupeStatus::Duplicate]
        {
            assert_eq!(status.as_str().parse::<DedupeStatus>(), Ok(status));
        }
        assert!("maybe".parse::<DedupeStatus>().is_err());
    }
}
