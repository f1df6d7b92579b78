//! Canonical label sets used as aggregation keys.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::{Serialize, Serializer};

static EMPTY: LazyLock<LabelSet> = LazyLock::new(|| LabelSet {
    labels: Arc::from(Vec::new()),
});

/// Immutable, canonical key/value mapping attached to a recording.
///
/// Pairs are stored sorted by key with unique keys, so two label sets built
/// from the same pairs in a different order compare equal and hash
/// identically. Cloning only bumps a reference count.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet {
    labels: Arc<[(String, String)]>,
}

impl LabelSet {
    /// Build a label set from arbitrary pairs.
    ///
    /// When a key appears more than once the last value wins.
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        if sorted.is_empty() {
            return Self::empty();
        }

        Self {
            labels: sorted.into_iter().collect::<Vec<_>>().into(),
        }
    }

    /// The shared empty label set.
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the set carries no labels
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Look up the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.labels[idx].1.as_str())
    }

    /// Iterate over pairs in canonical (key-sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical `k=v,k=v` encoding, stable across equal sets.
    pub fn encoded(&self) -> String {
        let mut out = String::new();
        for (idx, (k, v)) in self.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }

    /// Whether both handles share one allocation.
    pub fn shares_storage_with(&self, other: &LabelSet) -> bool {
        Arc::ptr_eq(&self.labels, &other.labels)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.encoded())
    }
}

impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
