//! Core traits for caching functionality

use crate::proxy::HeaderSet;
use bytes::Bytes;

/// Cached response: encoded image bytes plus the sanitized upstream headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheItem {
    /// Raw content, cheap to clone
    pub content: Bytes,

    /// Response headers with transport framing already stripped
    pub headers: HeaderSet,
}

impl CacheItem {
    pub fn new(content: impl Into<Bytes>, headers: HeaderSet) -> Self {
        Self { content: content.into(), headers }
    }
}

/// Core caching trait
///
/// Implementations are internally synchronized, so every method takes `&self`
/// and a cache can be shared behind an `Arc`.
pub trait Cache<K, V>: Send + Sync {
    /// Get a value and promote it to most-recently-used
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or update a value. Returns `true` when the key was already cached.
    fn set(&self, key: K, value: V) -> bool;

    /// Clear all entries from the cache
    fn clear(&self);

    /// Get the number of entries in the cache
    fn len(&self) -> usize;

    /// Check if the cache is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the capacity of the cache
    fn capacity(&self) -> usize;
}
