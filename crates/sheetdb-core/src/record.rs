//! Dynamic row representation
//!
//! A [`Record`] is one row of a table as an ordered field-to-value mapping.
//! The field set is not fixed; it is inferred per table from upstream
//! headers, so values are always optional strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conventional identifier field name.
pub const ID_FIELD: &str = "id";

/// One row of a table as a field -> value mapping.
///
/// Values are strings or null; numeric comparisons go through explicit
/// try-parse helpers rather than implicit coercion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Option<String>>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value; absent fields and null values both read as `None`
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(|v| v.as_deref())
    }

    /// Whether the field is present at all (even if null)
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Set a field value
    pub fn insert(&mut self, field: impl Into<String>, value: Option<String>) {
        self.0.insert(field.into(), value);
    }

    /// Builder-style field setter, convenient in tests and fixtures
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, Some(value.into()));
        self
    }

    /// Builder-style null field setter
    pub fn with_null(mut self, field: impl Into<String>) -> Self {
        self.insert(field, None);
        self
    }

    /// Overlay every field of `other` onto this record
    pub fn merge(&mut self, other: &Record) {
        for (field, value) in &other.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Iterate fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Field names in order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Option<String>>> for Record {
    fn from(map: BTreeMap<String, Option<String>>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Option<String>)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
