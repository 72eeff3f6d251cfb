//! Metrics consumption traits.
//!
//! - **Snapshot**: copy counters out for tests and benches.
//! - **Reset**: zero counters between benchmark iterations.
//! - **Export**: publish a snapshot to a monitoring backend.

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
