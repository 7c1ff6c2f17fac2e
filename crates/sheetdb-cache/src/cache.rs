//! Query result cache
//!
//! LRU store of executed query results with per-entry expiry. Invalidation
//! is the caller's job: the cache never watches upstream writes, so
//! insert/update/delete logic must invalidate the affected table right
//! after a confirmed write.

use crate::config::CacheConfig;
use crate::key::CacheKey;
use crate::stats::CacheStats;
use lru::LruCache;
use parking_lot::RwLock;
use sheetdb_core::Record;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached query result
    pub rows: Vec<Record>,
    /// When this entry stops being served
    pub expires_at: Instant,
}

impl CacheEntry {
    fn new(rows: Vec<Record>, ttl: Duration) -> Self {
        Self {
            rows,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Whether the entry has outlived its TTL
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe query result cache with TTL and prefix invalidation.
pub struct QueryCache {
    cache: RwLock<LruCache<CacheKey, CacheEntry, ahash::RandomState>>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
}

impl QueryCache {
    /// Create a cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::with_hasher(capacity, ahash::RandomState::new())),
            config,
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Create a cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Whether caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Look up a cached result.
    ///
    /// Disabled mode and expired entries both read as absent; an expired
    /// entry is dropped on the way out.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Record>> {
        if !self.config.enabled {
            return None;
        }

        let mut cache = self.cache.write();
        let expired = match cache.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.stats.record_hit();
                tracing::debug!(key = %key, "cache hit");
                return Some(entry.rows.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            cache.pop(key);
            self.stats.record_expiration();
        }
        self.stats.record_miss();
        tracing::debug!(key = %key, "cache miss");
        None
    }

    /// Store a result under the key with the default TTL.
    ///
    /// Returns whether the entry was stored; always `false` when disabled.
    pub fn put(&self, key: CacheKey, rows: Vec<Record>) -> bool {
        self.put_with_ttl(key, rows, self.config.ttl)
    }

    /// Store a result with an explicit TTL
    pub fn put_with_ttl(&self, key: CacheKey, rows: Vec<Record>, ttl: Duration) -> bool {
        if !self.config.enabled {
            return false;
        }

        let mut cache = self.cache.write();
        if let Some((evicted_key, _)) = cache.push(key.clone(), CacheEntry::new(rows, ttl)) {
            // push returns the replaced entry for an existing key and the
            // LRU victim otherwise; only the latter counts as an eviction
            if evicted_key != key {
                self.stats.record_eviction();
            }
        }
        self.stats.record_set();
        true
    }

    /// Remove every entry whose key sits in the table's partition.
    ///
    /// Returns the number of removed entries.
    pub fn invalidate_table(&self, table: &str) -> usize {
        if !self.config.enabled {
            return 0;
        }

        let mut cache = self.cache.write();
        let doomed: Vec<CacheKey> = cache
            .iter()
            .filter(|(key, _)| key.in_table(table))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            cache.pop(key);
        }
        self.stats.record_deletes(doomed.len() as u64);
        tracing::debug!(table, removed = doomed.len(), "cache invalidated");
        doomed.len()
    }

    /// Clear the entire store. Returns the number of removed entries.
    pub fn invalidate_all(&self) -> usize {
        if !self.config.enabled {
            return 0;
        }

        let mut cache = self.cache.write();
        let removed = cache.len();
        cache.clear();
        self.stats.record_deletes(removed as u64);
        removed
    }

    /// Drop entries past their TTL. Returns the number removed.
    pub fn expire_stale(&self) -> usize {
        let mut cache = self.cache.write();
        let stale: Vec<CacheKey> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            cache.pop(key);
            self.stats.record_expiration();
        }
        stale.len()
    }

    /// Shared statistics handle
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// The cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("enabled", &self.config.enabled)
            .field("max_entries", &self.config.max_entries)
            .field("ttl", &self.config.ttl)
            .field("current_entries", &self.len())
            .finish()
    }
}
