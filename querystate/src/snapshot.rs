//! Immutable query-string snapshots.
//!
//! A [`QuerySnapshot`] is the wire text of one moment: an ordered list of
//! percent-decoded `(key, value)` pairs. It is never changed in place;
//! writes produce a new snapshot that the host swaps in as a whole.

use std::fmt;
use std::str::FromStr;

use crate::config::{CollectionFormat, QueryStateConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySnapshot {
    pairs: Vec<(String, String)>,
}

impl QuerySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse query-string text, with or without a leading `?`.
    ///
    /// `+` and percent escapes are decoded exactly once.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value stored under `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// The decoded tokens of a field, or `None` when its key is absent.
    pub fn field_tokens(
        &self,
        key: &str,
        collection: bool,
        config: &QueryStateConfig,
    ) -> Option<Vec<String>> {
        if !collection {
            return self.get(key).map(|value| vec![value.to_string()]);
        }
        match config.collection_format {
            CollectionFormat::Repeated => {
                let values = self.get_all(&config.collection_key(key));
                if values.is_empty() {
                    None
                } else {
                    Some(values.into_iter().map(str::to_string).collect())
                }
            }
            CollectionFormat::Joined => self.get(key).map(|joined| {
                joined
                    .split(config.separator)
                    .map(str::to_string)
                    .collect()
            }),
        }
    }

    /// Returns true when the field has any entry in this snapshot.
    pub fn has_field(&self, key: &str, collection: bool, config: &QueryStateConfig) -> bool {
        if collection {
            self.contains_key(&config.collection_key(key))
        } else {
            self.contains_key(key)
        }
    }
}

/// Accumulates the pairs of a new snapshot.
#[derive(Debug, Default)]
pub(crate) struct SnapshotWriter {
    pairs: Vec<(String, String)>,
}

impl SnapshotWriter {
    pub(crate) fn from_snapshot(snapshot: &QuerySnapshot) -> Self {
        Self {
            pairs: snapshot.pairs.clone(),
        }
    }

    /// Write a field's tokens; no tokens means no entry.
    pub(crate) fn write_field(
        &mut self,
        key: &str,
        collection: bool,
        tokens: Vec<String>,
        config: &QueryStateConfig,
    ) {
        if tokens.is_empty() {
            return;
        }
        if !collection {
            if let Some(first) = tokens.into_iter().next() {
                self.pairs.push((key.to_string(), first));
            }
            return;
        }
        match config.collection_format {
            CollectionFormat::Repeated => {
                let name = config.collection_key(key);
                self.pairs
                    .extend(tokens.into_iter().map(|token| (name.clone(), token)));
            }
            CollectionFormat::Joined => {
                let joined = tokens.join(&config.separator.to_string());
                self.pairs.push((key.to_string(), joined));
            }
        }
    }

    pub(crate) fn finish(self) -> QuerySnapshot {
        QuerySnapshot { pairs: self.pairs }
    }
}

impl fmt::Display for QuerySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

impl FromStr for QuerySnapshot {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QuerySnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
