//! Caching module for resizr
//!
//! Leaves first: [`list::OrderedList`] backs [`lru::BoundedLru`], two of which
//! make up a [`durable::DurableCache`] (memory order + storage order).

pub mod durable;
pub mod eviction;
pub mod key;
pub mod list;
pub mod lru;
pub mod store;
pub mod traits;

pub use durable::DurableCache;
pub use key::{cache_key, converted_uri};
pub use lru::{BoundedLru, Record, Upsert};
pub use traits::{Cache, CacheItem};
