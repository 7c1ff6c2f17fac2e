//! Table store orchestration
//!
//! Query flow: derive the cache key, consult the cache, and only on a
//! miss fetch raw rows from the transport and run them through the
//! engine, storing the result under the key. Concurrent misses on one
//! key are funneled through a per-key lock so a single transport fetch
//! serves every waiter.
//!
//! Write flow: writes go straight to the transport; the affected table's
//! cache entries are invalidated only after the transport confirms the
//! write. A reader racing into that window may observe one stale cached
//! read, which is accepted.

use crate::transport::RowTransport;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use sheetdb_cache::{CacheKey, CacheStatsSnapshot, QueryCache};
use sheetdb_core::{Error, QuerySpec, Record, Result, ID_FIELD};
use sheetdb_engine::QueryEngine;
use sheetdb_id::{IdAllocator, IdStrategy};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How inserts allocate a missing identifier.
#[derive(Debug, Clone, Default)]
pub struct IdOptions {
    pub strategy: IdStrategy,
    pub prefix: Option<String>,
}

/// Cache-first facade over one transport.
///
/// One instance is built at startup and injected wherever table access is
/// needed; the cache is shared process-wide state.
pub struct TableStore {
    transport: Arc<dyn RowTransport>,
    cache: Arc<QueryCache>,
    engine: QueryEngine,
    allocator: IdAllocator,
    /// Per-key locks deduplicating concurrent cold fetches
    fetch_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TableStore {
    pub fn new(transport: Arc<dyn RowTransport>, cache: Arc<QueryCache>) -> Self {
        Self {
            transport,
            cache,
            engine: QueryEngine::new(),
            allocator: IdAllocator::new(),
            fetch_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Execute a query, serving from cache when possible.
    pub async fn query(&self, spec: &QuerySpec) -> Result<Vec<Record>> {
        spec.validate()?;
        let key = CacheKey::for_query(&spec.table, spec);

        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows);
        }

        // Funnel concurrent misses for this key through one lock so only
        // one transport fetch happens; waiters re-check the cache
        let lock = {
            let mut locks = self.fetch_locks.lock();
            Arc::clone(locks.entry(key.as_str().to_string()).or_default())
        };
        let _guard = lock.lock().await;

        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows);
        }

        let result: Result<Vec<Record>> = async {
            let raw = self.transport.fetch_all(&spec.table).await?;
            let rows = self.engine.execute(raw, spec)?;
            self.cache.put(key.clone(), rows.clone());
            Ok(rows)
        }
        .await;

        // The entry must go on failure as well, or a down transport
        // grows the lock map by one entry per distinct key
        self.fetch_locks.lock().remove(key.as_str());

        let rows = result?;
        tracing::debug!(table = %spec.table, count = rows.len(), "query executed");
        Ok(rows)
    }

    /// Insert a record, allocating an identifier when none is supplied.
    ///
    /// Returns the finalized record including its identifier and a
    /// `created_at` stamp.
    pub async fn insert(
        &self,
        table: &str,
        mut record: Record,
        options: Option<IdOptions>,
    ) -> Result<Record> {
        if table.is_empty() {
            return Err(Error::validation("a table is required for insert"));
        }

        if record.get(ID_FIELD).is_none() {
            let existing = self.transport.fetch_all(table).await?;
            let ids: HashSet<String> = existing
                .iter()
                .filter_map(|r| r.get(ID_FIELD).map(String::from))
                .collect();
            let options = options.unwrap_or_default();
            let id = self
                .allocator
                .generate(options.strategy, &ids, options.prefix.as_deref());
            tracing::debug!(table, id = %id, strategy = %options.strategy, "allocated id");
            record.insert(ID_FIELD, Some(id));
        }

        if record.get("created_at").is_none() {
            record.insert("created_at", Some(now_stamp()));
        }

        self.transport.append_record(table, &record).await?;
        self.cache.invalidate_table(table);
        Ok(record)
    }

    /// Merge `data` over the record with the given id and write it back.
    pub async fn update(&self, table: &str, id: &str, data: Record) -> Result<Record> {
        let rows = self.transport.fetch_all(table).await?;
        let position = find_by_id(&rows, id).ok_or_else(|| Error::not_found(table, id))?;

        let mut merged = rows[position].clone();
        merged.merge(&data);
        merged.insert("updated_at", Some(now_stamp()));

        self.transport.update_record(table, position, &merged).await?;
        self.cache.invalidate_table(table);
        Ok(merged)
    }

    /// Remove the record with the given id. Returns its position.
    pub async fn delete(&self, table: &str, id: &str) -> Result<usize> {
        let rows = self.transport.fetch_all(table).await?;
        let position = find_by_id(&rows, id).ok_or_else(|| Error::not_found(table, id))?;

        self.transport.clear_record(table, position).await?;
        self.cache.invalidate_table(table);
        Ok(position)
    }

    /// Point-in-time cache counters
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats().snapshot()
    }

    /// Clear cache entries for one table, or everything.
    /// Returns the number of removed entries.
    pub fn invalidate_cache(&self, table: Option<&str>) -> usize {
        match table {
            Some(table) => self.cache.invalidate_table(table),
            None => self.cache.invalidate_all(),
        }
    }

    /// The shared cache handle
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }
}

fn find_by_id(rows: &[Record], id: &str) -> Option<usize> {
    rows.iter()
        .position(|row| row.get(ID_FIELD).is_some_and(|v| v == id))
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use async_trait::async_trait;
    use sheetdb_cache::CacheConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Transport wrapper counting fetches, with an optional delay to
    /// widen race windows.
    struct CountingTransport {
        inner: MemoryTransport,
        fetches: AtomicUsize,
        delay: Duration,
    }

    impl CountingTransport {
        fn new(inner: MemoryTransport) -> Self {
            Self {
                inner,
                fetches: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RowTransport for CountingTransport {
        async fn fetch_all(&self, table: &str) -> Result<Vec<Record>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.fetch_all(table).await
        }

        async fn append_record(&self, table: &str, record: &Record) -> Result<()> {
            self.inner.append_record(table, record).await
        }

        async fn update_record(&self, table: &str, position: usize, record: &Record) -> Result<()> {
            self.inner.update_record(table, position, record).await
        }

        async fn clear_record(&self, table: &str, position: usize) -> Result<()> {
            self.inner.clear_record(table, position).await
        }
    }

    fn flowers() -> Vec<Record> {
        vec![
            Record::new().with("id", "1").with("name", "Rosa").with("price", "10"),
            Record::new().with("id", "2").with("name", "Tulip").with("price", "20"),
        ]
    }

    fn store_over(transport: Arc<dyn RowTransport>) -> TableStore {
        TableStore::new(transport, Arc::new(QueryCache::with_defaults()))
    }

    #[tokio::test]
    async fn test_query_serves_second_call_from_cache() {
        let transport = Arc::new(CountingTransport::new(
            MemoryTransport::new().with_table("flowers", flowers()),
        ));
        let store = store_over(Arc::clone(&transport) as Arc<dyn RowTransport>);
        let spec = QuerySpec::builder("flowers").build().unwrap();

        let first = store.query(&spec).await.unwrap();
        let second = store.query(&spec).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.fetches(), 1);
        assert_eq!(store.cache_stats().hits, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cold_queries_fetch_once() {
        let transport = Arc::new(CountingTransport::new(
            MemoryTransport::new().with_table("flowers", flowers()),
        ).with_delay(Duration::from_millis(30)));
        let store = Arc::new(store_over(Arc::clone(&transport) as Arc<dyn RowTransport>));
        let spec = QuerySpec::builder("flowers").build().unwrap();

        let mut handles = vec![];
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let spec = spec.clone();
            handles.push(tokio::spawn(async move { store.query(&spec).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().len(), 2);
        }

        assert_eq!(transport.fetches(), 1);
    }

    /// Transport whose reads always fail, as a down backend would.
    struct FailingTransport;

    #[async_trait]
    impl RowTransport for FailingTransport {
        async fn fetch_all(&self, table: &str) -> Result<Vec<Record>> {
            Err(Error::store(format!("cannot reach table '{table}'")))
        }

        async fn append_record(&self, _table: &str, _record: &Record) -> Result<()> {
            Err(Error::store("unreachable"))
        }

        async fn update_record(&self, _table: &str, _position: usize, _record: &Record) -> Result<()> {
            Err(Error::store("unreachable"))
        }

        async fn clear_record(&self, _table: &str, _position: usize) -> Result<()> {
            Err(Error::store("unreachable"))
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_propagates_store_error() {
        let store = store_over(Arc::new(FailingTransport));
        let spec = QuerySpec::builder("flowers").build().unwrap();

        let err = store.query(&spec).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_failed_fetch_releases_lock_entries() {
        let store = store_over(Arc::new(FailingTransport));

        for i in 0..50 {
            let spec = QuerySpec::builder("flowers")
                .eq("type", i.to_string())
                .build()
                .unwrap();
            assert!(store.query(&spec).await.is_err());
        }

        // Failed fetches must not leave per-key locks behind
        assert_eq!(store.fetch_locks.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_successful_fetch_releases_lock_entry() {
        let transport = Arc::new(MemoryTransport::new().with_table("flowers", flowers()));
        let store = store_over(transport);
        let spec = QuerySpec::builder("flowers").build().unwrap();

        store.query(&spec).await.unwrap();
        assert_eq!(store.fetch_locks.lock().len(), 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let transport = Arc::new(CountingTransport::new(
            MemoryTransport::new().with_table("flowers", flowers()),
        ));
        let store = TableStore::new(
            Arc::clone(&transport) as Arc<dyn RowTransport>,
            Arc::new(QueryCache::new(CacheConfig::disabled())),
        );
        let spec = QuerySpec::builder("flowers").build().unwrap();

        store.query(&spec).await.unwrap();
        store.query(&spec).await.unwrap();
        assert_eq!(transport.fetches(), 2);
    }

    #[tokio::test]
    async fn test_insert_allocates_id_and_stamps_created_at() {
        let transport = Arc::new(MemoryTransport::new().with_table("flowers", flowers()));
        let store = store_over(Arc::clone(&transport) as Arc<dyn RowTransport>);

        let record = store
            .insert("flowers", Record::new().with("name", "Daisy"), None)
            .await
            .unwrap();

        let id = record.get("id").unwrap();
        assert_eq!(id.len(), 36); // default strategy is uuid
        assert!(record.get("created_at").is_some());
        assert_eq!(transport.row_count("flowers"), 3);
    }

    #[tokio::test]
    async fn test_insert_keeps_supplied_id() {
        let transport = Arc::new(CountingTransport::new(MemoryTransport::new()));
        let store = store_over(Arc::clone(&transport) as Arc<dyn RowTransport>);

        let record = store
            .insert("flowers", Record::new().with("id", "rose-1"), None)
            .await
            .unwrap();

        assert_eq!(record.get("id"), Some("rose-1"));
        // No existing-id scan is needed when the id is supplied
        assert_eq!(transport.fetches(), 0);
    }

    #[tokio::test]
    async fn test_insert_honors_strategy_and_prefix() {
        let transport = Arc::new(MemoryTransport::new());
        let store = store_over(Arc::clone(&transport) as Arc<dyn RowTransport>);

        let record = store
            .insert(
                "orders",
                Record::new().with("total", "40"),
                Some(IdOptions {
                    strategy: IdStrategy::Readable,
                    prefix: Some("order".to_string()),
                }),
            )
            .await
            .unwrap();

        assert!(record.get("id").unwrap().starts_with("order-"));
    }

    #[tokio::test]
    async fn test_insert_invalidates_table_cache() {
        let transport = Arc::new(CountingTransport::new(
            MemoryTransport::new().with_table("flowers", flowers()),
        ));
        let store = store_over(Arc::clone(&transport) as Arc<dyn RowTransport>);
        let spec = QuerySpec::builder("flowers").build().unwrap();

        assert_eq!(store.query(&spec).await.unwrap().len(), 2);
        store
            .insert("flowers", Record::new().with("id", "3").with("name", "Daisy"), None)
            .await
            .unwrap();

        // Cache was invalidated, so the fresh row is visible
        assert_eq!(store.query(&spec).await.unwrap().len(), 3);
        assert_eq!(transport.fetches(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps() {
        let transport = Arc::new(MemoryTransport::new().with_table("flowers", flowers()));
        let store = store_over(Arc::clone(&transport) as Arc<dyn RowTransport>);

        let updated = store
            .update("flowers", "2", Record::new().with("price", "25"))
            .await
            .unwrap();

        assert_eq!(updated.get("name"), Some("Tulip"));
        assert_eq!(updated.get("price"), Some("25"));
        assert!(updated.get("updated_at").is_some());

        let rows = transport.fetch_all("flowers").await.unwrap();
        assert_eq!(rows[1].get("price"), Some("25"));
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let transport = Arc::new(MemoryTransport::new().with_table("flowers", flowers()));
        let store = store_over(transport);

        let err = store
            .update("flowers", "99", Record::new().with("price", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_returns_position_and_invalidates() {
        let transport = Arc::new(MemoryTransport::new().with_table("flowers", flowers()));
        let store = store_over(Arc::clone(&transport) as Arc<dyn RowTransport>);
        let spec = QuerySpec::builder("flowers").build().unwrap();
        store.query(&spec).await.unwrap();

        let position = store.delete("flowers", "1").await.unwrap();
        assert_eq!(position, 0);
        assert_eq!(transport.row_count("flowers"), 1);
        assert_eq!(store.query(&spec).await.unwrap().len(), 1);

        let err = store.delete("flowers", "1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_cache_administration() {
        let transport = Arc::new(MemoryTransport::new().with_table("flowers", flowers()));
        let store = store_over(transport);
        let spec = QuerySpec::builder("flowers").build().unwrap();

        store.query(&spec).await.unwrap();
        store.query(&spec).await.unwrap();

        let stats = store.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);

        assert_eq!(store.invalidate_cache(Some("flowers")), 1);
        assert_eq!(store.invalidate_cache(None), 0);
    }
}
