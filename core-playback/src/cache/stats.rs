//! Media cache counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of media cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Requests served from a decoded buffer.
    pub hits: u64,
    /// Requests that started a new fetch+decode.
    pub misses: u64,
    /// Requests that joined a load already in flight.
    pub coalesced: u64,
    /// Loads that settled with an error.
    pub failures: u64,
    /// Decoded buffers held.
    pub ready: usize,
    /// Loads in flight.
    pub loading: usize,
}

impl CacheStats {
    pub fn requests(&self) -> u64 {
        self.hits + self.misses + self.coalesced
    }

    /// Share of requests that needed no new fetch, in `[0.0, 1.0]`.
    pub fn hit_ratio(&self) -> f64 {
        let requests = self.requests();
        if requests == 0 {
            return 0.0;
        }
        (self.hits + self.coalesced) as f64 / requests as f64
    }
}

#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn coalesce(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, ready: usize, loading: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            ready,
            loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_counts_coalesced_waits() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            coalesced: 1,
            ..CacheStats::default()
        };
        assert_eq!(stats.requests(), 4);
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
