//! linkmap: a concurrent bounded map with FIFO, LRU and second-chance
//! eviction.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;
pub mod listener;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod policy;

pub mod prelude;
