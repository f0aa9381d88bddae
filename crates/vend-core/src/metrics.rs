//! Global atomic counters for account vending.
//!
//! Incremented by the orchestrator as reports are built. Call
//! [`Metrics::flush`] at the end of a command to log the totals.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    requests: AtomicU64,
    failed_steps: AtomicU64,
    dispatches_accepted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            failed_steps: AtomicU64::new(0),
            dispatches_accepted: AtomicU64::new(0),
        }
    }

    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "requests", "counter incremented");
    }

    pub fn inc_failed_steps(&self) {
        self.failed_steps.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "failed_steps", "counter incremented");
    }

    pub fn inc_dispatches_accepted(&self) {
        self.dispatches_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "dispatches_accepted", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            requests = self.requests(),
            failed_steps = self.failed_steps(),
            dispatches_accepted = self.dispatches_accepted(),
        );
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn failed_steps(&self) -> u64 {
        self.failed_steps.load(Ordering::Relaxed)
    }

    pub fn dispatches_accepted(&self) -> u64 {
        self.dispatches_accepted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (tests only).
    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.failed_steps.store(0, Ordering::Relaxed);
        self.dispatches_accepted.store(0, Ordering::Relaxed);
    }
}
