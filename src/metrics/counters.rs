use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::CacheMetricsSnapshot;

/// Relaxed atomic counters shared by all threads using a cache.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removals: AtomicU64,
    evictions: AtomicU64,
    scan_steps: AtomicU64,
    drains: AtomicU64,
    drained_events: AtomicU64,
    stale_events: AtomicU64,
}

impl CacheCounters {
    /// Copies counters into a snapshot; gauges are left for the caller.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            get_hits: self.hits.load(Ordering::Relaxed),
            get_misses: self.misses.load(Ordering::Relaxed),
            insert_new: self.inserts.load(Ordering::Relaxed),
            insert_updates: self.updates.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            evicted_entries: self.evictions.load(Ordering::Relaxed),
            evict_scan_steps: self.scan_steps.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            drained_events: self.drained_events.load(Ordering::Relaxed),
            stale_events: self.stale_events.load(Ordering::Relaxed),
            ..CacheMetricsSnapshot::default()
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.inserts,
            &self.updates,
            &self.removals,
            &self.evictions,
            &self.scan_steps,
            &self.drains,
            &self.drained_events,
            &self.stale_events,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_scan_steps(&self, steps: u64) {
        self.scan_steps.fetch_add(steps, Ordering::Relaxed);
    }

    /// Records one drain that consumed `events`, `stale` of which were dead.
    #[inline]
    pub fn record_drain(&self, events: u64, stale: u64) {
        self.drains.fetch_add(1, Ordering::Relaxed);
        self.drained_events.fetch_add(events, Ordering::Relaxed);
        self.stale_events.fetch_add(stale, Ordering::Relaxed);
    }
}
