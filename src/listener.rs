//! Eviction notifications.
//!
//! A listener is told about every entry that leaves the cache, whether by
//! capacity eviction, explicit removal or `clear`. It runs after the entry is
//! gone from both the index and the eviction deque, with no cache lock held,
//! so it may call back into the cache.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use linkmap::cache::ConcurrentLinkedCache;
//! use linkmap::policy::EvictionPolicy;
//!
//! let evicted = Arc::new(Mutex::new(Vec::new()));
//! let sink = evicted.clone();
//! let cache = ConcurrentLinkedCache::builder(1)
//!     .policy(EvictionPolicy::Fifo)
//!     .listener(move |key: u32, value: Arc<String>| {
//!         sink.lock().unwrap().push((key, value.to_string()));
//!     })
//!     .build();
//!
//! cache.insert(1, "one".to_string());
//! cache.insert(2, "two".to_string());
//! assert_eq!(*evicted.lock().unwrap(), vec![(1, "one".to_string())]);
//! ```

use std::sync::Arc;

/// Receives `(key, value)` for every entry removed from a cache.
pub trait EvictionListener<K, V>: Send + Sync {
    fn on_evict(&self, key: K, value: Arc<V>);
}

impl<K, V, F> EvictionListener<K, V> for F
where
    F: Fn(K, Arc<V>) + Send + Sync,
{
    #[inline]
    fn on_evict(&self, key: K, value: Arc<V>) {
        self(key, value)
    }
}
