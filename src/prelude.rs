pub use crate::builder::CacheBuilder;
pub use crate::cache::ConcurrentLinkedCache;
pub use crate::error::{ConfigError, InvariantError};
pub use crate::listener::EvictionListener;
#[cfg(feature = "metrics")]
pub use crate::metrics::{
    CacheMetricsSnapshot, MetricsExporter, MetricsReset, MetricsSnapshotProvider,
    PrometheusTextExporter,
};
pub use crate::policy::EvictionPolicy;
