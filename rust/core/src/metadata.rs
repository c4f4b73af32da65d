// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ordered key-value annotations attached to a single attribute.
//!
//! Keys may repeat. The most recently added entry for a key is the one that
//! lookups see; earlier entries are kept (and encoded) but shadowed.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A typed value stored in attribute metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Int(i64),
    Double(f64),
    String(String),
}

impl MetadataValue {
    /// Wire tag used by the binary codec.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            MetadataValue::Int(_) => 0,
            MetadataValue::Double(_) => 1,
            MetadataValue::String(_) => 2,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            MetadataValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Int(v) => write!(f, "{v}"),
            MetadataValue::Double(v) => write!(f, "{v}"),
            MetadataValue::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Int(value.into())
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Double(value)
    }
}

/// Metadata attached to one attribute: an ordered list of key/value entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    entries: Vec<(String, MetadataValue)>,
}

impl AttributeMetadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. A repeated key shadows earlier entries for that key.
    pub fn add_entry(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn add_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.add_entry(key, MetadataValue::String(value.into()));
    }

    pub fn add_int(&mut self, key: impl Into<String>, value: i64) {
        self.add_entry(key, MetadataValue::Int(value));
    }

    pub fn add_double(&mut self, key: impl Into<String>, value: f64) {
        self.add_entry(key, MetadataValue::Double(value));
    }

    /// Returns the most recently added value for `key`.
    pub fn get_entry(&self, key: &str) -> Option<&MetadataValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get_entry(key).and_then(MetadataValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get_entry(key).and_then(MetadataValue::as_int)
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.get_entry(key).and_then(MetadataValue::as_double)
    }

    /// Returns `true` if the current value for `key` equals `value` in both
    /// kind and content. `Int(44)` does not match `Double(44.0)` or `"44"`.
    pub fn matches(&self, key: &str, value: &MetadataValue) -> bool {
        self.get_entry(key) == Some(value)
    }

    /// Returns `true` if any entry uses `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// All entries in insertion order, shadowed ones included.
    pub fn entries(&self) -> &[(String, MetadataValue)] {
        &self.entries
    }

    /// The entries lookups can see: one per key, ordered by each key's last write.
    pub fn effective_entries(&self) -> Vec<(&str, &MetadataValue)> {
        let mut seen = FxHashSet::default();
        let mut visible: Vec<(&str, &MetadataValue)> = self
            .entries
            .iter()
            .rev()
            .filter(|(k, _)| seen.insert(k.as_str()))
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        visible.reverse();
        visible
    }

    /// Number of entries, shadowed ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
