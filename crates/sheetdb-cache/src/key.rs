//! Cache key derivation
//!
//! Keys are `"<table>:<canonical-spec>"` where the canonical form is the
//! spec rendered through a `serde_json::Value`, whose object keys are
//! sorted. Two specs with identical semantic fields therefore derive the
//! same key no matter the order their builder methods ran in.

use serde_json::Value;
use sheetdb_core::QuerySpec;

/// Deterministic cache key for one (table, spec) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a query against a table
    pub fn for_query(table: &str, spec: &QuerySpec) -> Self {
        let canonical = serde_json::to_value(spec)
            .unwrap_or(Value::Null)
            .to_string();
        Self(format!("{table}:{canonical}"))
    }

    /// Wrap an already-derived key string
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to the given table's partition
    pub fn in_table(&self, table: &str) -> bool {
        self.0.len() > table.len()
            && self.0.as_bytes()[table.len()] == b':'
            && self.0.starts_with(table)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
