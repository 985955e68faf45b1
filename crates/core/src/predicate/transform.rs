//! String transforms applied by token-set predicates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How a single (already lowercased) string is turned into blocking keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StringTransform {
    /// The whole string.
    Whole,
    /// Every alphanumeric token.
    Tokens,
    FirstToken,
    /// First two tokens; abstains on single-token strings.
    FirstTwoTokens,
    /// Every run of digits, leading zeros dropped.
    Integers,
    /// Every integer and its two neighbours.
    NearIntegers,
    /// First `len` characters of the string with spaces removed.
    Prefix { len: usize },
    /// Character n-grams of the string with spaces removed.
    Ngrams { len: usize },
    /// Sorted first letters of each word.
    SortedAcronym,
    /// DOI with resolver prefixes stripped.
    Doi,
}

impl StringTransform {
    /// Length parameter, for transforms that carry one.
    #[must_use]
    pub const fn len_param(self) -> Option<usize> {
        match self {
            Self::Prefix { len } | Self::Ngrams { len } => Some(len),
            _ => None,
        }
    }

    pub(crate) fn apply(self, s: &str, out: &mut BTreeSet<String>) {
        match self {
            Self::Whole => {
                out.insert(s.to_owned());
            },
            Self::Tokens => out.extend(tokens(s).map(str::to_owned)),
            Self::FirstToken => out.extend(tokens(s).next().map(str::to_owned)),
            Self::FirstTwoTokens => {
                let mut it = tokens(s);
                if let (Some(a), Some(b)) = (it.next(), it.next()) {
                    out.insert(format!("{a} {b}"));
                }
            },
            Self::Integers => out.extend(integers(s)),
            Self::NearIntegers => {
                for n in integers(s).filter_map(|i| i.parse::<u64>().ok()) {
                    out.extend(
                        [n.checked_sub(1), Some(n), n.checked_add(1)]
                            .into_iter()
                            .flatten()
                            .map(|v| v.to_string()),
                    );
                }
            },
            Self::Prefix { len } => {
                let compact: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
                if len > 0 && compact.len() >= len {
                    out.insert(compact.iter().take(len).collect());
                }
            },
            Self::Ngrams { len } => {
                let compact: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
                if len > 0 {
                    out.extend(compact.windows(len).map(|w| w.iter().collect::<String>()));
                }
            },
            Self::SortedAcronym => {
                let mut initials: Vec<char> =
                    s.split_whitespace().filter_map(|w| w.chars().next()).collect();
                if !initials.is_empty() {
                    initials.sort_unstable();
                    out.insert(initials.into_iter().collect());
                }
            },
            Self::Doi => {
                let doi = strip_doi_prefix(s.trim());
                if !doi.is_empty() {
                    out.insert(doi.to_owned());
                }
            },
        }
    }
}

/// Alphanumeric tokens in order of appearance.
pub(crate) fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

fn integers(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_ascii_digit()).filter(|t| !t.is_empty()).map(|digits| {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() { "0".to_owned() } else { trimmed.to_owned() }
    })
}

fn strip_doi_prefix(s: &str) -> &str {
    const PREFIXES: [&str; 4] = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "doi:"];
    PREFIXES
        .iter()
        .find_map(|p| s.strip_prefix(p))
        .map_or(s, str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(t: StringTransform, s: &str) -> Vec<String> {
        let mut out = BTreeSet::new();
        t.apply(s, &mut out);
        out.into_iter().collect()
    }

    #[test]
    fn tokens_split_on_punctuation() {
        assert_eq!(run(StringTransform::Tokens, "cats, dogs & cats"), vec!["cats", "dogs"]);
    }

    #[test]
    fn first_two_tokens_abstains_on_single_token() {
        assert!(run(StringTransform::FirstTwoTokens, "cats").is_empty());
        assert_eq!(run(StringTransform::FirstTwoTokens, "the cat sat"), vec!["the cat"]);
    }

    #[test]
    fn integers_drop_leading_zeros() {
        assert_eq!(run(StringTransform::Integers, "vol 007 no 12"), vec!["12", "7"]);
        assert_eq!(run(StringTransform::Integers, "000"), vec!["0"]);
    }

    #[test]
    fn near_integers_include_neighbours() {
        assert_eq!(run(StringTransform::NearIntegers, "2019"), vec!["2018", "2019", "2020"]);
        assert_eq!(run(StringTransform::NearIntegers, "0"), vec!["0", "1"]);
    }

    #[test]
    fn prefix_requires_enough_characters() {
        assert_eq!(run(StringTransform::Prefix { len: 3 }, "a b c d"), vec!["abc"]);
        assert!(run(StringTransform::Prefix { len: 5 }, "abc").is_empty());
    }

    #[test]
    fn ngrams_ignore_whitespace() {
        assert_eq!(run(StringTransform::Ngrams { len: 3 }, "ab cd"), vec!["abc", "bcd"]);
        assert!(run(StringTransform::Ngrams { len: 4 }, "abc").is_empty());
    }

    #[test]
    fn sorted_acronym_orders_initials() {
        assert_eq!(run(StringTransform::SortedAcronym, "systematic review of cats"), vec![
            "cors"
        ]);
    }

    #[test]
    fn doi_strips_resolver() {
        assert_eq!(run(StringTransform::Doi, "https://doi.org/10.1000/xyz"), vec!["10.1000/xyz"]);
        assert_eq!(run(StringTransform::Doi, "doi: 10.1000/xyz"), vec!["10.1000/xyz"]);
        assert_eq!(run(StringTransform::Doi, "10.1000/xyz"), vec!["10.1000/xyz"]);
    }
}
