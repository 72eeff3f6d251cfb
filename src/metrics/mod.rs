//! Cache counters, snapshots and export.
//!
//! ## Architecture
//!
//! ```text
//!   ConcurrentLinkedCache ──records──► CacheCounters (relaxed atomics)
//!            │
//!            └──MetricsSnapshotProvider──► CacheMetricsSnapshot
//!                                                │
//!                                        MetricsExporter
//!                                                ▼
//!                                   PrometheusTextExporter
//! ```
//!
//! The whole module, and every counter update in the cache, compiles only
//! with the `metrics` feature.
//!
//! Recording is split from reading: the cache only increments relaxed
//! atomics, snapshots copy them out, exporters publish snapshots.

pub mod counters;
pub mod exporter;
pub mod snapshot;
pub mod traits;

pub use counters::CacheCounters;
pub use exporter::PrometheusTextExporter;
pub use snapshot::CacheMetricsSnapshot;
pub use traits::{MetricsExporter, MetricsReset, MetricsSnapshotProvider};
