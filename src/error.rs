//! Error types for linkmap.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: returned when a capacity, shard count or buffer size is
//!   rejected. Nothing is mutated when it is returned.
//! - [`InvariantError`]: returned by
//!   [`ConcurrentLinkedCache::check_invariants`](crate::cache::ConcurrentLinkedCache::check_invariants)
//!   when the index and the eviction deque disagree. Indicates a bug, never a
//!   user mistake.
//!
//! Absence and value mismatches on conditional operations are not errors;
//! they are reported through `Option`/`bool` returns.
//!
//! ## Example Usage
//!
//! ```
//! use linkmap::cache::ConcurrentLinkedCache;
//! use linkmap::error::ConfigError;
//! use linkmap::policy::EvictionPolicy;
//!
//! let cache: Result<ConcurrentLinkedCache<u64, u64>, ConfigError> =
//!     ConcurrentLinkedCache::try_new(0, EvictionPolicy::Lru);
//! assert!(cache.unwrap_err().to_string().contains("capacity"));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Disagreement between the index and the eviction deque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A capacity, shard count or buffer size that was rejected.
///
/// # Example
///
/// ```
/// use linkmap::cache::ConcurrentLinkedCache;
/// use linkmap::policy::EvictionPolicy;
///
/// let cache: ConcurrentLinkedCache<u64, u64> = ConcurrentLinkedCache::new(4, EvictionPolicy::Fifo);
/// let err = cache.set_capacity(0).unwrap_err();
/// assert!(err.message().contains("capacity"));
/// assert_eq!(cache.capacity(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }

    pub(crate) fn non_positive_capacity(capacity: impl fmt::Display) -> Self {
        Self::new(format!("capacity must be > 0, got {capacity}"))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}
