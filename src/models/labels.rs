//! Label sets and their stable fingerprints.

use std::{
    collections::BTreeMap,
    fmt,
    iter::FromIterator,
};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Separator byte inserted between label names and values when hashing, so
/// that `{a: "bc"}` and `{ab: "c"}` hash differently.
pub(crate) const HASH_SEPARATOR: u8 = 0xff;

/// An ordered set of label name/value pairs identifying an alert series.
///
/// Ordering is inherent to the representation (`BTreeMap`), which makes the
/// fingerprint stable across restarts and replicas.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Creates an empty label set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for a label name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Inserts a label pair, replacing any existing value for the name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns true if no labels are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of label pairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over label pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Computes the stable 64-bit fingerprint of the full label set.
    ///
    /// The fingerprint is persisted in the notification log, so the hashing
    /// scheme must not change between releases.
    pub fn fingerprint(&self) -> u64 {
        let mut buf = Vec::with_capacity(self.0.len() * 16);
        for (name, value) in &self.0 {
            buf.extend_from_slice(name.as_bytes());
            buf.push(HASH_SEPARATOR);
            buf.extend_from_slice(value.as_bytes());
            buf.push(HASH_SEPARATOR);
        }
        xxh3_64(&buf)
    }

    /// Computes a fingerprint over the named subset of labels only. Labels
    /// absent from the set are skipped, so two series that agree on all the
    /// named labels produce the same value.
    pub fn grouping_fingerprint(&self, names: &[String]) -> u64 {
        let mut buf = Vec::new();
        // Iteration follows map order, not `names` order, so the result is
        // independent of how the grouping labels are listed in config.
        for (name, value) in &self.0 {
            if names.iter().any(|n| n == name) {
                buf.extend_from_slice(name.as_bytes());
                buf.push(HASH_SEPARATOR);
                buf.extend_from_slice(value.as_bytes());
                buf.push(HASH_SEPARATOR);
            }
        }
        xxh3_64(&buf)
    }

    /// Returns the subset of labels shared (same name and value) between
    /// `self` and `other`.
    pub fn intersection(&self, other: &LabelSet) -> LabelSet {
        self.0
            .iter()
            .filter(|(k, v)| other.get(k).is_some_and(|ov| ov == v.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(String, String)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for LabelSet {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_insensitive() {
        let mut a = LabelSet::new();
        a.insert("alertname", "HighLatency");
        a.insert("severity", "page");

        let mut b = LabelSet::new();
        b.insert("severity", "page");
        b.insert("alertname", "HighLatency");

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_name_value_boundaries() {
        let a = LabelSet::from([("a", "bc")]);
        let b = LabelSet::from([("ab", "c")]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_value() {
        let a = LabelSet::from([("alertname", "HighLatency")]);
        let b = LabelSet::from([("alertname", "HighErrorRate")]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn grouping_fingerprint_ignores_unlisted_labels() {
        let a = LabelSet::from([("alertname", "HighLatency"), ("instance", "host-1")]);
        let b = LabelSet::from([("alertname", "HighLatency"), ("instance", "host-2")]);
        let names = vec!["alertname".to_string()];
        assert_eq!(a.grouping_fingerprint(&names), b.grouping_fingerprint(&names));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn grouping_fingerprint_is_independent_of_name_listing_order() {
        let labels = LabelSet::from([("alertname", "HighLatency"), ("cluster", "eu-1")]);
        let forward = vec!["alertname".to_string(), "cluster".to_string()];
        let backward = vec!["cluster".to_string(), "alertname".to_string()];
        assert_eq!(
            labels.grouping_fingerprint(&forward),
            labels.grouping_fingerprint(&backward)
        );
    }

    #[test]
    fn intersection_keeps_shared_pairs_only() {
        let a = LabelSet::from([("alertname", "X"), ("severity", "page"), ("instance", "h1")]);
        let b = LabelSet::from([("alertname", "X"), ("severity", "warn"), ("instance", "h1")]);
        let common = a.intersection(&b);
        assert_eq!(common, LabelSet::from([("alertname", "X"), ("instance", "h1")]));
    }

    #[test]
    fn display_renders_braced_key_value_pairs() {
        let labels = LabelSet::from([("alertname", "X"), ("severity", "page")]);
        assert_eq!(labels.to_string(), r#"{alertname="X", severity="page"}"#);
    }
}
