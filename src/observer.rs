//! Transfer observer: byte counting and the early-abort threshold

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Received-byte threshold (64 KiB). A transfer that delivers this much
/// payload proves the path can sustain throughput and is aborted early.
pub const THRESHOLD_BYTES: u64 = 64 * 1024;

/// Tracks received bytes for one in-flight transfer. Owned by a single
/// probe instance; never shared across probes.
#[derive(Debug, Default)]
pub struct TransferObserver {
    received: AtomicU64,
    aborted_by_threshold: AtomicBool,
}

impl TransferObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` more received bytes. The counter only ever grows.
    pub fn add(&self, n: u64) {
        self.received.fetch_add(n, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Abort decision, checked on every progress notification. Reaching
    /// the threshold is the only condition that requests an abort.
    pub fn should_abort(&self) -> bool {
        if self.received() >= THRESHOLD_BYTES {
            self.aborted_by_threshold.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// True iff this observer itself requested the abort.
    pub fn aborted_by_threshold(&self) -> bool {
        self.aborted_by_threshold.load(Ordering::Relaxed)
    }
}
