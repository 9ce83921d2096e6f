//! Shared repository cache
//!
//! One process-wide, thread-safe cache shared by every backend adapter.
//! It holds three kinds of entries under namespaced string keys:
//!
//! - `r/<repo>/<id>`: individual records
//! - `q/<repo>/<hash>`: memoized query result pages
//! - `c/<repo>`: counts
//!
//! Record entries are kept coherent individually: adapters mirror every
//! successful write and evict on remove. Query and count entries are
//! invalidated wholesale per repository on every committed write to that
//! repository ([`RepositoryCache::invalidate_repository`]); this is the
//! strengthened policy chosen over the reference design's unbounded
//! staleness window.
//!
//! Eviction beyond explicit invalidation is LRU with a configured
//! maximum entry count; there is no TTL.

use crate::lru::LruCache;
use parking_lot::Mutex;
use polystore_core::{QueryResults, Record};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Default maximum entry count
pub const DEFAULT_CAPACITY: usize = 10_240;

/// Heterogeneous cached value
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// A single record, keyed by object id
    Record(Record),
    /// A memoized query result page
    Results(QueryResults),
    /// A count scalar
    Count(u64),
}

/// Hit/miss counters, read for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through
    pub misses: u64,
    /// Current entry count
    pub entries: usize,
}

/// Process-wide cache for records, query results, and counts
///
/// Internally thread-safe; shared across adapters and repositories via
/// `Arc`, independent of any single transaction's lifecycle.
pub struct RepositoryCache {
    inner: Mutex<LruCache<CachedValue>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RepositoryCache {
    /// Create a cache bounded to `capacity` entries
    pub fn new(capacity: usize) -> Self {
        RepositoryCache {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn record_key(repository: &str, id: &str) -> String {
        format!("r/{repository}/{id}")
    }

    fn query_key(repository: &str, token: u64) -> String {
        format!("q/{repository}/{token:016x}")
    }

    fn count_key(repository: &str) -> String {
        format!("c/{repository}")
    }

    fn lookup(&self, key: &str) -> Option<CachedValue> {
        let found = self.inner.lock().get(key).cloned();
        match &found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    // ========== Record entries ==========

    /// Mirror a record under its id key
    pub fn put_record(&self, repository: &str, id: &str, record: &Record) {
        self.inner.lock().put(
            Self::record_key(repository, id),
            CachedValue::Record(record.clone()),
        );
    }

    /// Fetch a cached record
    pub fn get_record(&self, repository: &str, id: &str) -> Option<Record> {
        match self.lookup(&Self::record_key(repository, id)) {
            Some(CachedValue::Record(r)) => Some(r),
            _ => None,
        }
    }

    /// Existence check without counting as a hit or miss
    pub fn contains_record(&self, repository: &str, id: &str) -> bool {
        self.inner
            .lock()
            .contains_key(&Self::record_key(repository, id))
    }

    /// Evict one record entry
    pub fn evict_record(&self, repository: &str, id: &str) {
        self.inner.lock().remove(&Self::record_key(repository, id));
    }

    // ========== Query result entries ==========

    /// Memoize a query result page
    pub fn put_results(&self, repository: &str, token: u64, results: &QueryResults) {
        self.inner.lock().put(
            Self::query_key(repository, token),
            CachedValue::Results(results.clone()),
        );
    }

    /// Fetch a memoized query result page
    pub fn get_results(&self, repository: &str, token: u64) -> Option<QueryResults> {
        match self.lookup(&Self::query_key(repository, token)) {
            Some(CachedValue::Results(r)) => Some(r),
            _ => None,
        }
    }

    // ========== Count entries ==========

    /// Cache a repository count
    pub fn put_count(&self, repository: &str, count: u64) {
        self.inner
            .lock()
            .put(Self::count_key(repository), CachedValue::Count(count));
    }

    /// Fetch a cached count
    pub fn get_count(&self, repository: &str) -> Option<u64> {
        match self.lookup(&Self::count_key(repository)) {
            Some(CachedValue::Count(c)) => Some(c),
            _ => None,
        }
    }

    // ========== Invalidation ==========

    /// Drop every query and count entry for one repository
    ///
    /// Called by transaction backends after a committed write. Record
    /// entries are left alone; they were kept coherent at write time.
    pub fn invalidate_repository(&self, repository: &str) {
        let mut inner = self.inner.lock();
        let removed = inner.remove_prefix(&format!("q/{repository}/"));
        inner.remove(&Self::count_key(repository));
        debug!(repository, removed, "invalidated query/count cache entries");
    }

    /// Drop everything
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Current hit/miss/entry counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.inner.lock().len(),
        }
    }
}
