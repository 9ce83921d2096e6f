//! Bounded LRU map
//!
//! The eviction core under [`crate::repo_cache::RepositoryCache`]. Not
//! thread-safe on its own; the owner wraps it in a lock. Recency is a
//! monotonic use counter with a `BTreeMap` index from counter to key, so
//! both touch and evict are O(log n).

use std::collections::{BTreeMap, HashMap};

struct Slot<V> {
    value: V,
    stamp: u64,
}

/// String-keyed LRU map with a fixed maximum entry count
///
/// A capacity of zero disables storage entirely: every `put` is dropped.
pub struct LruCache<V> {
    capacity: usize,
    next_stamp: u64,
    entries: HashMap<String, Slot<V>>,
    order: BTreeMap<u64, String>,
}

impl<V> LruCache<V> {
    /// Create a cache bounded to `capacity` entries
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity,
            next_stamp: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    /// Maximum entry count
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bump(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    /// Get a value, marking it most recently used
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let stamp = self.bump();
        let slot = self.entries.get_mut(key)?;
        self.order.remove(&slot.stamp);
        slot.stamp = stamp;
        self.order.insert(stamp, key.to_string());
        Some(&slot.value)
    }

    /// Check presence without touching recency
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a value, evicting the least recently used entry
    /// if the bound is exceeded
    pub fn put(&mut self, key: String, value: V) {
        if self.capacity == 0 {
            return;
        }
        let stamp = self.bump();
        if let Some(old) = self.entries.insert(key.clone(), Slot { value, stamp }) {
            self.order.remove(&old.stamp);
        }
        self.order.insert(stamp, key);
        while self.entries.len() > self.capacity {
            if let Some((&oldest, _)) = self.order.iter().next() {
                if let Some(victim) = self.order.remove(&oldest) {
                    self.entries.remove(&victim);
                }
            }
        }
    }

    /// Remove one entry
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.stamp);
        Some(slot.value)
    }

    /// Remove every entry whose key starts with `prefix`; returns the
    /// number of entries removed
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let victims: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &victims {
            self.remove(key);
        }
        victims.len()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let mut lru = LruCache::new(4);
        lru.put("a".into(), 1);
        assert_eq!(lru.get("a"), Some(&1));
        assert!(lru.get("b").is_none());
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_replace_keeps_single_entry() {
        let mut lru = LruCache::new(4);
        lru.put("a".into(), 1);
        lru.put("a".into(), 2);
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.get("a"), Some(&2));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut lru = LruCache::new(2);
        lru.put("a".into(), 1);
        lru.put("b".into(), 2);
        lru.get("a"); // b is now the LRU entry
        lru.put("c".into(), 3);

        assert!(lru.contains_key("a"));
        assert!(!lru.contains_key("b"));
        assert!(lru.contains_key("c"));
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_bound_holds_under_churn() {
        let mut lru = LruCache::new(8);
        for i in 0..100 {
            lru.put(format!("k{i}"), i);
        }
        assert_eq!(lru.len(), 8);
        // the newest entries survive
        assert!(lru.contains_key("k99"));
        assert!(!lru.contains_key("k0"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut lru = LruCache::new(0);
        lru.put("a".into(), 1);
        assert!(lru.is_empty());
        assert!(lru.get("a").is_none());
    }

    #[test]
    fn test_remove() {
        let mut lru = LruCache::new(4);
        lru.put("a".into(), 1);
        assert_eq!(lru.remove("a"), Some(1));
        assert!(lru.remove("a").is_none());
        assert!(lru.is_empty());
    }

    #[test]
    fn test_remove_prefix() {
        let mut lru = LruCache::new(16);
        lru.put("q/article/1".into(), 1);
        lru.put("q/article/2".into(), 2);
        lru.put("q/user/1".into(), 3);
        lru.put("r/article/9".into(), 4);

        assert_eq!(lru.remove_prefix("q/article/"), 2);
        assert!(!lru.contains_key("q/article/1"));
        assert!(lru.contains_key("q/user/1"));
        assert!(lru.contains_key("r/article/9"));
    }

    #[test]
    fn test_clear() {
        let mut lru = LruCache::new(4);
        lru.put("a".into(), 1);
        lru.put("b".into(), 2);
        lru.clear();
        assert!(lru.is_empty());
        lru.put("c".into(), 3);
        assert_eq!(lru.len(), 1);
    }
}
