//! LRU (Least Recently Used) cache implementation
//!
//! A capacity-bound key/value store with O(1) get/set, built from a HashMap
//! index and an [`OrderedList`] recency list. One mutex guards both, so
//! `index.len() == list.len()` holds whenever the lock is free.
//!
//! Evictions are handed back to the caller instead of running a callback under
//! the lock. Whatever the caller does with them (e.g. queueing file deletion)
//! happens after the lock is released, so it can never re-enter the cache or
//! stall other readers. Eviction order is the same as an in-lock callback
//! would observe.

use super::list::{Handle, OrderedList};
use super::traits::Cache;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A (key, value) pair stored as the payload of a list node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<K, V> {
    pub key: K,
    pub value: V,
}

/// Result of [`BoundedLru::insert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert<K, V> {
    /// The key was already present and got updated in place
    pub existed: bool,
    /// Entry pushed out to respect the capacity
    pub evicted: Option<Record<K, V>>,
}

struct Inner<K, V> {
    list: OrderedList<Record<K, V>>,
    index: HashMap<K, Handle>,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
{
    fn with_capacity(capacity: usize) -> Self {
        Self { list: OrderedList::with_capacity(capacity), index: HashMap::with_capacity(capacity) }
    }
}

/// Thread-safe LRU cache with configurable capacity
///
/// A capacity of 0 turns the cache into a sink: nothing is stored and every
/// insert reports the new record as immediately evicted.
pub struct BoundedLru<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> BoundedLru<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(Inner::with_capacity(capacity)) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().index.contains_key(key)
    }

    /// Insert or update `key`, promoting it to the front.
    pub fn insert(&self, key: K, value: V) -> Upsert<K, V> {
        if self.capacity == 0 {
            return Upsert { existed: false, evicted: Some(Record { key, value }) };
        }

        let mut inner = self.lock();

        if let Some(&handle) = inner.index.get(&key) {
            if let Some(record) = inner.list.get_mut(handle) {
                record.value = value;
            }
            inner.list.move_to_front(handle);
            return Upsert { existed: true, evicted: None };
        }

        let handle = inner.list.push_front(Record { key: key.clone(), value });
        inner.index.insert(key, handle);

        let mut evicted = None;
        if inner.list.len() > self.capacity {
            if let Some(back) = inner.list.back() {
                if let Some(record) = inner.list.remove(back) {
                    inner.index.remove(&record.key);
                    evicted = Some(record);
                }
            }
        }

        Upsert { existed: false, evicted }
    }

    /// Promote `key` and return its value
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let mut inner = self.lock();
        let handle = *inner.index.get(key)?;
        inner.list.move_to_front(handle);
        inner.list.get(handle).map(|record| record.value.clone())
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let handle = inner.index.remove(key)?;
        inner.list.remove(handle).map(|record| record.value)
    }

    /// Empty the cache and return every entry, front to back
    pub fn drain(&self) -> Vec<Record<K, V>> {
        let mut inner = self.lock();
        let old = std::mem::replace(&mut *inner, Inner::with_capacity(self.capacity));
        drop(inner);

        let Inner { mut list, .. } = old;
        let mut records = Vec::with_capacity(list.len());
        while let Some(front) = list.front() {
            match list.remove(front) {
                Some(record) => records.push(record),
                None => break,
            }
        }
        records
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<K> {
        self.lock().list.iter().map(|record| record.key.clone()).collect()
    }

    /// Check that the index and the list describe the same entries and that the
    /// list links agree in both directions.
    pub fn is_consistent(&self) -> bool {
        let inner = self.lock();
        let forward: Vec<&K> = inner.list.iter().map(|r| &r.key).collect();
        let mut backward: Vec<&K> = inner.list.iter_rev().map(|r| &r.key).collect();
        backward.reverse();

        forward.len() == inner.index.len()
            && forward.len() == inner.list.len()
            && forward == backward
            && forward.iter().all(|k| inner.index.contains_key(*k))
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Cache<K, V> for BoundedLru<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        BoundedLru::get(self, key)
    }

    fn set(&self, key: K, value: V) -> bool {
        self.insert(key, value).existed
    }

    fn clear(&self) {
        self.drain();
    }

    fn len(&self) -> usize {
        BoundedLru::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lru_basic_operations() {
        let cache = BoundedLru::new(2);

        assert!(!cache.insert("a", 1).existed);
        assert!(!cache.insert("b", 2).existed);

        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_miss_has_no_side_effects() {
        let cache = BoundedLru::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.get(&"zzz"), None);
        assert_eq!(cache.keys(), vec!["b", "a"]);
    }

    #[test]
    fn test_lru_update_existing() {
        let cache = BoundedLru::new(2);

        cache.insert("a", 1);
        cache.insert("b", 2);

        // Update "a" (should move to front)
        let upsert = cache.insert("a", 10);
        assert!(upsert.existed);
        assert!(upsert.evicted.is_none());

        let upsert = cache.insert("c", 3); // Should evict "b", not "a"
        assert_eq!(upsert.evicted, Some(Record { key: "b", value: 2 }));

        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn test_eviction_by_count() {
        let cache = BoundedLru::new(3);
        for key in ["a", "b", "c"] {
            assert!(cache.insert(key, ()).evicted.is_none());
        }
        let upsert = cache.insert("d", ());

        assert_eq!(upsert.evicted.map(|r| r.key), Some("a"));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"d"), Some(()));
    }

    #[test]
    fn test_eviction_by_recency() {
        let cache = BoundedLru::new(3);
        cache.insert("a", ());
        cache.insert("b", ());
        cache.insert("c", ());
        cache.get(&"a");
        cache.get(&"a");
        cache.get(&"b");
        cache.get(&"b");
        cache.insert("d", ());

        assert_eq!(cache.get(&"c"), None);
        assert_eq!(cache.get(&"a"), Some(()));
        assert_eq!(cache.get(&"b"), Some(()));
    }

    #[test]
    fn test_zero_capacity_is_a_sink() {
        let cache = BoundedLru::new(0);

        let upsert = cache.insert("a", 1);
        assert!(!upsert.existed);
        assert_eq!(upsert.evicted, Some(Record { key: "a", value: 1 }));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_drain_returns_front_to_back() {
        let cache = BoundedLru::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        cache.get(&"a");

        let drained: Vec<_> = cache.drain().into_iter().map(|r| r.key).collect();
        assert_eq!(drained, vec!["a", "c", "b"]);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_consistent());
    }

    #[test]
    fn test_lru_remove() {
        let cache = BoundedLru::new(3);

        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        assert_eq!(cache.remove(&"b"), Some(2));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"b"), None);
        assert!(cache.is_consistent());
    }

    #[test]
    fn test_repeated_get_is_idempotent() {
        let cache = BoundedLru::new(2);
        cache.insert("k", String::from("value"));

        let first = cache.get(&"k");
        let second = cache.get(&"k");
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("value"));
    }

    #[test]
    fn test_cache_trait_object() {
        let cache: Arc<dyn Cache<String, u32>> = Arc::new(BoundedLru::new(1));
        assert!(!cache.set("a".into(), 1));
        assert!(cache.set("a".into(), 2));
        assert_eq!(cache.get(&"a".to_string()), Some(2));
        assert_eq!(cache.capacity(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_operations_keep_structure() {
        let cache = Arc::new(BoundedLru::new(16));
        let mut handles = Vec::new();

        for t in 0..8u32 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..500u32 {
                    let key = (t * 7 + i) % 40;
                    match i % 5 {
                        0 | 1 => {
                            cache.insert(key, i);
                        }
                        2 | 3 => {
                            cache.get(&key);
                        }
                        _ if i % 100 == 4 => {
                            cache.drain();
                        }
                        _ => {
                            cache.remove(&key);
                        }
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
        assert!(cache.is_consistent());
    }
}
