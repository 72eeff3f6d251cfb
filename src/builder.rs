//! Configuration for [`ConcurrentLinkedCache`].
//!
//! ## Example
//!
//! ```rust
//! use linkmap::builder::CacheBuilder;
//! use linkmap::policy::EvictionPolicy;
//!
//! let cache = CacheBuilder::<u64, String>::new(100)
//!     .policy(EvictionPolicy::SecondChance)
//!     .shards(8)
//!     .access_buffer_capacity(64)
//!     .try_build()
//!     .unwrap();
//! cache.insert(1, "hello".to_string());
//! assert_eq!(cache.get(&1).as_deref(), Some(&"hello".to_string()));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::ConcurrentLinkedCache;
use crate::ds::access_buffer::DEFAULT_ACCESS_BUFFER_CAPACITY;
use crate::error::ConfigError;
use crate::listener::EvictionListener;
use crate::policy::EvictionPolicy;

/// Shard count used when none is configured: four per available core,
/// rounded up to a power of two.
pub fn default_shard_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1);
    (cores * 4).next_power_of_two()
}

/// Builder for [`ConcurrentLinkedCache`].
pub struct CacheBuilder<K, V> {
    pub(crate) capacity: usize,
    pub(crate) policy: EvictionPolicy,
    pub(crate) shards: usize,
    pub(crate) access_buffer_capacity: usize,
    pub(crate) listener: Option<Arc<dyn EvictionListener<K, V>>>,
}

impl<K, V> CacheBuilder<K, V> {
    /// Starts a configuration bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            policy: EvictionPolicy::default(),
            shards: default_shard_count(),
            access_buffer_capacity: DEFAULT_ACCESS_BUFFER_CAPACITY,
            listener: None,
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of independently locked index partitions.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Number of read hits buffered before a reader is forced to drain.
    pub fn access_buffer_capacity(mut self, capacity: usize) -> Self {
        self.access_buffer_capacity = capacity;
        self
    }

    pub fn listener(mut self, listener: impl EvictionListener<K, V> + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Shares an existing listener, e.g. between a cache and its clone.
    pub fn shared_listener(mut self, listener: Arc<dyn EvictionListener<K, V>>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::non_positive_capacity(self.capacity));
        }
        if self.shards == 0 {
            return Err(ConfigError::new("shards must be > 0"));
        }
        if self.access_buffer_capacity == 0 {
            return Err(ConfigError::new("access_buffer_capacity must be > 0"));
        }
        Ok(())
    }

    pub fn try_build(self) -> Result<ConcurrentLinkedCache<K, V>, ConfigError>
    where
        K: Clone + Eq + Hash,
    {
        self.validate()?;
        Ok(ConcurrentLinkedCache::from_builder(self))
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; see [`CacheBuilder::try_build`].
    pub fn build(self) -> ConcurrentLinkedCache<K, V>
    where
        K: Clone + Eq + Hash,
    {
        match self.try_build() {
            Ok(cache) => cache,
            Err(err) => panic!("invalid cache configuration: {err}"),
        }
    }
}

impl<K, V> fmt::Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("shards", &self.shards)
            .field("access_buffer_capacity", &self.access_buffer_capacity)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let builder: CacheBuilder<u64, u64> = CacheBuilder::new(10);
        assert_eq!(builder.policy, EvictionPolicy::Lru);
        assert_eq!(builder.access_buffer_capacity, DEFAULT_ACCESS_BUFFER_CAPACITY);
        assert!(builder.shards.is_power_of_two());
        assert!(builder.listener.is_none());
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = CacheBuilder::<u64, u64>::new(0).try_build().unwrap_err();
        assert!(err.message().contains("capacity"));
    }

    #[test]
    fn rejects_zero_shards_and_buffer() {
        assert!(
            CacheBuilder::<u64, u64>::new(1)
                .shards(0)
                .try_build()
                .is_err()
        );
        assert!(
            CacheBuilder::<u64, u64>::new(1)
                .access_buffer_capacity(0)
                .try_build()
                .is_err()
        );
    }

    #[test]
    #[should_panic(expected = "invalid cache configuration")]
    fn build_panics_on_invalid_config() {
        let _ = CacheBuilder::<u64, u64>::new(0).build();
    }

    #[test]
    fn builds_configured_cache() {
        let cache = CacheBuilder::<u64, u64>::new(3)
            .policy(EvictionPolicy::Fifo)
            .shards(2)
            .try_build()
            .unwrap();
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.policy(), EvictionPolicy::Fifo);
        assert_eq!(cache.shard_count(), 2);
    }
}
