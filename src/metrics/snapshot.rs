/// Point-in-time copy of a cache's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,

    pub insert_new: u64,
    pub insert_updates: u64,
    pub removals: u64,

    pub evicted_entries: u64,
    pub evict_scan_steps: u64, // second-chance reprieves granted while picking victims

    pub drains: u64,
    pub drained_events: u64,
    pub stale_events: u64, // drained events whose entry was already gone

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
    pub pending_events: usize,
}

impl CacheMetricsSnapshot {
    pub fn get_calls(&self) -> u64 {
        self.get_hits + self.get_misses
    }

    /// Fraction of `get` calls that hit; `0.0` before the first call.
    pub fn hit_ratio(&self) -> f64 {
        match self.get_calls() {
            0 => 0.0,
            calls => self.get_hits as f64 / calls as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_handles_zero_calls() {
        let snapshot = CacheMetricsSnapshot::default();
        assert_eq!(snapshot.hit_ratio(), 0.0);
    }

    #[test]
    fn hit_ratio_counts_hits_over_calls() {
        let snapshot = CacheMetricsSnapshot {
            get_hits: 3,
            get_misses: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.get_calls(), 4);
        assert!((snapshot.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
