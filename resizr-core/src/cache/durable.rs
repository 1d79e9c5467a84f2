//! Two-tier cache: bounded memory order over a bounded on-disk order
//!
//! Both orders are [`BoundedLru`] instances with independent capacities. The
//! memory order holds the [`CacheItem`] itself; the storage order only records
//! which keys have artifacts on disk. Evicting from the storage order queues
//! the artifacts for deletion on a background worker.

use super::eviction::DeletionQueue;
use super::key::{cache_key, is_cache_key};
use super::lru::BoundedLru;
use super::store::ArtifactStore;
use super::traits::{Cache, CacheItem};
use crate::error::Result;
use crate::proxy::HeaderSet;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

pub struct DurableCache {
    memory: BoundedLru<String, CacheItem>,
    storage: BoundedLru<String, ()>,
    store: Arc<ArtifactStore>,
    deletions: DeletionQueue,
}

impl DurableCache {
    /// Open a cache rooted at `path` and warm it from existing artifacts.
    ///
    /// With `storage_capacity == 0` nothing is ever written to disk and any
    /// artifacts already present are removed.
    pub fn open(
        memory_capacity: usize,
        storage_capacity: usize,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let store = Arc::new(ArtifactStore::open(path.as_ref())?);
        let deletions = DeletionQueue::start(Arc::clone(&store), storage_capacity + 1)?;

        let cache = Self {
            memory: BoundedLru::new(memory_capacity),
            storage: BoundedLru::new(storage_capacity),
            store,
            deletions,
        };
        cache.warm_start()?;
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        self.store.root()
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn storage_len(&self) -> usize {
        self.storage.len()
    }

    /// Look up `uri`, falling back to disk on a memory miss
    pub fn get(&self, uri: &str) -> Option<CacheItem> {
        let key = cache_key(uri);

        if let Some(item) = self.memory.get(&key) {
            self.storage.get(&key);
            return Some(item);
        }

        self.storage.get(&key)?;

        match self.store.load(&key) {
            Ok(item) => {
                log::debug!("cache {}: loaded {} from disk", self.path().display(), key);
                self.memory.insert(key, item.clone());
                Some(item)
            }
            Err(e) => {
                log::warn!("cache {}: {}", self.path().display(), e);
                self.storage.remove(&key);
                self.discard(&key);
                None
            }
        }
    }

    /// Store `content` under `uri`. Returns `true` if the key was already cached.
    ///
    /// A key new to the storage order is persisted after the storage lock is
    /// released. Write failures are logged and the entry stays memory-only.
    /// If the key was evicted while its artifacts were being written, they
    /// are removed again so no file outlives its storage entry.
    pub fn set(&self, uri: &str, content: impl Into<Bytes>, headers: HeaderSet) -> bool {
        let key = cache_key(uri);
        let item = CacheItem::new(content, headers.sanitized());

        let memory = self.memory.insert(key.clone(), item.clone());

        if self.storage.capacity() == 0 {
            return memory.existed;
        }

        let storage = self.storage.insert(key.clone(), ());
        if let Some(evicted) = storage.evicted {
            self.deletions.enqueue(evicted.key);
        }

        if !storage.existed {
            match self.store.persist(&key, &item) {
                // evicted by another thread while writing
                Ok(()) if !self.storage.contains(&key) => self.discard(&key),
                Ok(()) => {}
                Err(e) => log::error!("cache {}: {}", self.path().display(), e),
            }
        }

        memory.existed || storage.existed
    }

    /// Drop every entry from both orders and queue all artifacts for deletion
    pub fn clear(&self) {
        self.memory.drain();
        for record in self.storage.drain() {
            self.deletions.enqueue(record.key);
        }
    }

    /// Flush pending deletions and stop the background worker.
    ///
    /// Evictions after shutdown delete their artifacts inline.
    pub fn shutdown(&self) {
        self.deletions.shutdown();
    }

    fn warm_start(&self) -> Result<()> {
        let (keys, orphans) = self.store.scan()?;

        for orphan in orphans.iter().filter(|k| is_cache_key(k)) {
            log::debug!("cache {}: removing orphan manifest {}", self.path().display(), orphan);
            self.discard(orphan);
        }

        let mut loaded = 0usize;
        for key in keys {
            if !is_cache_key(&key) {
                log::debug!("cache {}: ignoring foreign file {}", self.path().display(), key);
                continue;
            }

            let item = match self.store.load(&key) {
                Ok(item) => item,
                Err(e) => {
                    log::warn!("cache {}: dropping unreadable entry: {}", self.path().display(), e);
                    self.discard(&key);
                    continue;
                }
            };

            if self.storage.capacity() == 0 {
                self.discard(&key);
                continue;
            }

            let storage = self.storage.insert(key.clone(), ());
            if let Some(evicted) = storage.evicted {
                self.deletions.enqueue(evicted.key);
            }
            self.memory.insert(key, item);
            loaded += 1;
        }

        log::info!(
            "cache {}: warm start loaded {} entries ({} resident in memory)",
            self.path().display(),
            loaded,
            self.memory.len()
        );
        Ok(())
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            log::error!("cache {}: {}", self.path().display(), e);
        }
    }
}

impl Cache<String, CacheItem> for DurableCache {
    fn get(&self, uri: &String) -> Option<CacheItem> {
        DurableCache::get(self, uri)
    }

    fn set(&self, uri: String, item: CacheItem) -> bool {
        DurableCache::set(self, &uri, item.content, item.headers)
    }

    fn clear(&self) {
        DurableCache::clear(self)
    }

    /// Entries resident in memory
    fn len(&self) -> usize {
        self.memory.len()
    }

    fn capacity(&self) -> usize {
        self.memory.capacity()
    }
}
