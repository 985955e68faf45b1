//! Record normalizer.
//!
//! Converts a raw field map (as read from storage) into a deeply immutable,
//! hashable, totally ordered value. Lists become ordered sequences, nested
//! maps become sorted maps. Normalization is purely structural: it never
//! fails, and anything that is not a JSON object normalizes to an empty record.

use std::collections::BTreeMap;

/// One normalized field value.
///
/// Floats are stored by bit pattern so the whole tree can be `Eq + Hash + Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(u64),
    Text(String),
    Seq(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

static NULL: FieldValue = FieldValue::Null;

impl FieldValue {
    #[must_use]
    pub const fn float(v: f64) -> Self {
        Self::Float(v.to_bits())
    }

    /// True for values no predicate can block on: null, blank text,
    /// empty sequences and maps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Seq(items) => items.iter().all(Self::is_empty),
            Self::Map(map) => map.is_empty(),
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) => false,
        }
    }

    /// The scalar strings this value is made of, in order.
    ///
    /// Text, integers and floats render as themselves; sequences are
    /// flattened; maps, booleans and nulls contribute nothing.
    #[must_use]
    pub fn strings(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_strings(&mut out);
        out
    }

    fn collect_strings(&self, out: &mut Vec<String>) {
        match self {
            Self::Text(s) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_owned());
                }
            },
            Self::Integer(i) => out.push(i.to_string()),
            Self::Float(bits) => out.push(f64::from_bits(*bits).to_string()),
            Self::Seq(items) => items.iter().for_each(|item| item.collect_strings(out)),
            Self::Null | Self::Bool(_) | Self::Map(_) => {},
        }
    }

    /// Canonical single-string rendering of the whole value, `None` if empty.
    ///
    /// Scalars render as themselves. Sequences and maps render as compact
    /// JSON of their non-empty elements, so `["Smith; Doe"]` and
    /// `["Smith", "Doe"]` stay distinct.
    #[must_use]
    pub fn canonical(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Seq(_) | Self::Map(_) => serde_json::to_string(&self.canonical_json()).ok(),
            _ => self.strings().into_iter().next(),
        }
    }

    fn canonical_json(&self) -> serde_json::Value {
        match self {
            Self::Seq(items) => serde_json::Value::Array(
                items.iter().filter(|v| !v.is_empty()).map(Self::canonical_json).collect(),
            ),
            Self::Map(map) => serde_json::Value::Object(
                map.iter()
                    .filter(|(_, v)| !v.is_empty())
                    .map(|(k, v)| (k.clone(), v.canonical_json()))
                    .collect(),
            ),
            _ => self.canonical().map_or(serde_json::Value::Null, serde_json::Value::String),
        }
    }
}

/// A normalized citation record: field name to immutable value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl NormalizedRecord {
    /// Value of `field`; missing fields read as [`FieldValue::Null`].
    #[must_use]
    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for NormalizedRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

/// Normalize a raw record.
#[must_use]
pub fn normalize(raw: &serde_json::Value) -> NormalizedRecord {
    match raw {
        serde_json::Value::Object(map) => {
            map.iter().map(|(k, v)| (k.clone(), normalize_value(v))).collect()
        },
        _ => NormalizedRecord::default(),
    }
}

fn normalize_value(value: &serde_json::Value) -> FieldValue {
    use serde_json::Value;
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => n
            .as_i64()
            .map(FieldValue::Integer)
            .or_else(|| n.as_f64().map(FieldValue::float))
            .unwrap_or(FieldValue::Null),
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Array(items) => FieldValue::Seq(items.iter().map(normalize_value).collect()),
        Value::Object(map) => {
            FieldValue::Map(map.iter().map(|(k, v)| (k.clone(), normalize_value(v))).collect())
        },
    }
}
