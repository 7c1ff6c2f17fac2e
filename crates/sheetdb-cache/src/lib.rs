//! Query result cache for sheetdb
//!
//! Caches executed query results under a deterministic key derived from
//! the table name and the query spec. The key space is partitioned by a
//! literal `"<table>:"` prefix so a write to one table can invalidate
//! exactly that table's entries.
//!
//! # Features
//!
//! - **Deterministic keys**: two specs with the same semantic content hash
//!   to the same key regardless of construction order
//! - **TTL support**: per-entry expiry with a configurable default
//! - **Prefix invalidation**: per-table or full flush
//! - **Thread-safe**: safe for concurrent access using `RwLock`
//! - **Statistics**: hit/miss/set/delete counters
//! - **Disabled mode**: degrades to a permanent miss, never an error

pub mod cache;
pub mod config;
pub mod key;
pub mod stats;

pub use cache::{CacheEntry, QueryCache};
pub use config::CacheConfig;
pub use key::CacheKey;
pub use stats::{CacheStats, CacheStatsSnapshot};
