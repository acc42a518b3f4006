//! Lock-free end-to-end latency statistics
//!
//! Fed by subtracting an event's creation timestamp from the clock at the
//! observation point. Safe to record from any thread; reading while writers
//! are active gives a momentary snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct LatencyStats {
    count: AtomicU64,
    sum_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record(&self, nanos: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ns.fetch_add(nanos, Ordering::Relaxed);
        self.min_ns.fetch_min(nanos, Ordering::Relaxed);
        self.max_ns.fetch_max(nanos, Ordering::Relaxed);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn min_ns(&self) -> Option<u64> {
        match self.count() {
            0 => None,
            _ => Some(self.min_ns.load(Ordering::Relaxed)),
        }
    }

    #[inline]
    pub fn max_ns(&self) -> Option<u64> {
        match self.count() {
            0 => None,
            _ => Some(self.max_ns.load(Ordering::Relaxed)),
        }
    }

    #[inline]
    pub fn mean_ns(&self) -> Option<u64> {
        match self.count() {
            0 => None,
            n => Some(self.sum_ns.load(Ordering::Relaxed) / n),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}
