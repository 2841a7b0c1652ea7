//! Label sets and series identity.
//!
//! A series is identified by its label set. Two label sets that contain the
//! same `(name, value)` pairs identify the same series regardless of the order
//! in which the pairs were supplied, and labels with an empty value are
//! treated as absent.
//!
//! - [`Labels`] - Sorted label set used for both series and exemplar labels
//! - [`SeriesKey`] - Canonical string form of a normalized series label set
//! - [`LabelMatcher`] - Exact-equality matcher used by range queries

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

/// An ordered set of `(name, value)` label pairs.
///
/// Labels are kept sorted by name so that equality and hashing are
/// independent of insertion order. If the same name is supplied more than
/// once, the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Labels(Vec<(String, String)>);

impl Labels {
    /// Creates a label set from key-value pairs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use exemplars::Labels;
    ///
    /// let a = Labels::new([("job", "api"), ("instance", "web1")]);
    /// let b = Labels::new([("instance", "web1"), ("job", "api")]);
    /// assert_eq!(a, b);
    /// ```
    pub fn new<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        // Stable sort keeps the first occurrence of a repeated name in front.
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.dedup_by(|later, earlier| later.0 == earlier.0);
        Self(pairs)
    }

    /// Creates an empty label set.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns a copy of this label set with every empty-valued label removed.
    pub fn without_empty(&self) -> Self {
        if self.0.iter().all(|(_, v)| !v.is_empty()) {
            return self.clone();
        }
        Self(
            self.0
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .cloned()
                .collect(),
        )
    }

    /// Returns the value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .binary_search_by(|(k, _)| k.as_str().cmp(name))
            .ok()
            .map(|i| self.0[i].1.as_str())
    }

    /// Returns an iterator over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the canonical series key for this label set.
    ///
    /// Empty-valued labels are dropped before the key is computed. Names
    /// that are not plain identifiers are quoted and escaped like values, so
    /// distinct label sets never share a key.
    pub fn series_key(&self) -> SeriesKey {
        let mut key = String::from("{");
        for (i, (name, value)) in self.iter().filter(|(_, v)| !v.is_empty()).enumerate() {
            if i > 0 {
                key.push_str(", ");
            }
            if is_valid_label_name(name) {
                key.push_str(name);
            } else {
                let _ = write!(key, "{name:?}");
            }
            let _ = write!(key, "={value:?}");
        }
        key.push('}');
        SeriesKey(key)
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        f.write_str("}")
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Checks `[a-zA-Z_][a-zA-Z0-9_]*`.
pub(crate) fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Canonical identity of a series, used as the series index key.
///
/// The key is the `{name="value", ...}` rendering of the normalized label
/// set, with values always escaped and names escaped unless they are plain
/// identifiers. Set-equal label sets produce the same key and distinct ones
/// never do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey(String);

impl SeriesKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label-based matcher for selecting series in range queries.
///
/// A series matches if every label in the matcher is present in the series
/// labels with exactly the same value. An empty matcher matches every series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelMatcher {
    /// Required labels. BTreeMap keeps iteration deterministic.
    labels: BTreeMap<String, String>,
}

impl LabelMatcher {
    /// Creates a new label matcher from key-value pairs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use exemplars::{LabelMatcher, Labels};
    ///
    /// let matcher = LabelMatcher::new([("job", "api")]);
    /// assert!(matcher.matches(&Labels::new([("job", "api"), ("instance", "a")])));
    /// assert!(!matcher.matches(&Labels::new([("job", "db")])));
    /// ```
    pub fn new<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Creates an empty matcher that matches any series.
    pub fn any() -> Self {
        Self::default()
    }

    /// Checks if the given labels satisfy this matcher.
    pub fn matches(&self, labels: &Labels) -> bool {
        self.labels
            .iter()
            .all(|(name, value)| labels.get(name) == Some(value.as_str()))
    }

    /// Checks if this matcher requires no specific labels.
    pub fn is_any(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_sorted_and_deduplicated() {
        let labels = Labels::new([("b", "2"), ("a", "1"), ("b", "3")]);
        let pairs: Vec<_> = labels.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("b"), Some("2"));
        assert_eq!(labels.get("c"), None);
    }

    #[test]
    fn test_without_empty() {
        let labels = Labels::new([("a", "1"), ("b", ""), ("c", "3")]);
        let cleaned = labels.without_empty();
        assert_eq!(cleaned, Labels::new([("a", "1"), ("c", "3")]));

        let all_empty = Labels::new([("a", ""), ("b", "")]);
        assert!(all_empty.without_empty().is_empty());
    }

    #[test]
    fn test_display() {
        let labels = Labels::new([("service", "asdf"), ("env", "prod")]);
        assert_eq!(labels.to_string(), r#"{env="prod", service="asdf"}"#);
        assert_eq!(Labels::empty().to_string(), "{}");
    }

    #[test]
    fn test_series_key_order_independent() {
        let a = Labels::new([("job", "api"), ("instance", "web1")]);
        let b = Labels::new([("instance", "web1"), ("job", "api")]);
        assert_eq!(a.series_key(), b.series_key());
    }

    #[test]
    fn test_series_key_ignores_empty_values() {
        let a = Labels::new([("job", "api"), ("zone", "")]);
        let b = Labels::new([("job", "api")]);
        assert_eq!(a.series_key(), b.series_key());
        assert_eq!(a.series_key().as_str(), r#"{job="api"}"#);
    }

    #[test]
    fn test_series_key_escapes_values() {
        let a = Labels::new([("a", r#"1", b="2"#)]);
        let b = Labels::new([("a", "1"), ("b", "2")]);
        assert_ne!(a.series_key(), b.series_key());
    }

    #[test]
    fn test_series_key_escapes_names() {
        let plain = Labels::new([("a", "1"), ("b", "2")]);
        let quoted_name = Labels::new([(r#"a="1", b"#, "2")]);
        assert_eq!(plain.to_string(), quoted_name.to_string());
        assert_ne!(plain.series_key(), quoted_name.series_key());
        assert_eq!(quoted_name.series_key().as_str(), r#"{"a=\"1\", b"="2"}"#);
    }

    #[test]
    fn test_label_matcher() {
        let matcher = LabelMatcher::new([("service", "web"), ("env", "prod")]);

        assert!(matcher.matches(&Labels::new([
            ("service", "web"),
            ("env", "prod"),
            ("extra", "label"),
        ])));
        assert!(!matcher.matches(&Labels::new([("service", "web")])));
        assert!(!matcher.matches(&Labels::new([("service", "api"), ("env", "prod")])));

        let any = LabelMatcher::any();
        assert!(any.is_any());
        assert!(any.matches(&Labels::empty()));
    }
}
