//! Ordered header multi-map.
//!
//! Headers travel as a list of `[name, value]` pairs. Order and duplicate names
//! are preserved on both sides of the wire; lookups are case-insensitive.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Ordered list of header name/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Combined value for `name`, joined with `", "` when the header repeats.
    pub fn get(&self, name: &str) -> Option<String> {
        let values = self.get_all(name);
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wire form: `[[name, value], ...]`.
    pub fn to_pairs(&self) -> Vec<[String; 2]> {
        self.entries
            .iter()
            .map(|(k, v)| [k.clone(), v.clone()])
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for HeaderList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|(k, v)| [k, v]))
    }
}

/// Accepted input shapes: a list of pairs, or an object map taken in document order.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawHeaders {
    Pairs(Vec<(String, String)>),
    Map(serde_json::Map<String, Value>),
}

impl<'de> Deserialize<'de> for HeaderList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawHeaders::deserialize(deserializer)? {
            RawHeaders::Pairs(pairs) => Ok(pairs.into_iter().collect()),
            RawHeaders::Map(map) => map
                .into_iter()
                .map(|(name, value)| match value {
                    Value::String(s) => Ok((name, s)),
                    Value::Number(n) => Ok((name, n.to_string())),
                    Value::Bool(b) => Ok((name, b.to_string())),
                    other => Err(de::Error::custom(format!(
                        "header '{name}' must be a string, got {other}"
                    ))),
                })
                .collect(),
        }
    }
}
