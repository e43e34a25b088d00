//! Shared health state for the /health endpoint.
//! Updated by the hand ingestion handler, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Nanosecond timestamp of the last successful batch (0 = none).
    pub last_batch_at_ns: AtomicU64,
    /// Batches accepted since startup or the last reset.
    pub batches: AtomicU64,
    /// Hands skipped as malformed, out-of-range or already stored.
    pub hands_skipped: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, at_ns: u64, skipped: u64) {
        self.last_batch_at_ns.store(at_ns, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.hands_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.last_batch_at_ns.store(0, Ordering::Relaxed);
        self.batches.store(0, Ordering::Relaxed);
        self.hands_skipped.store(0, Ordering::Relaxed);
    }

    pub fn last_batch_at_ns(&self) -> u64 {
        self.last_batch_at_ns.load(Ordering::Relaxed)
    }

    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn hands_skipped(&self) -> u64 {
        self.hands_skipped.load(Ordering::Relaxed)
    }
}
