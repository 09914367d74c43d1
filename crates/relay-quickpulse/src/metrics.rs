//! Coordinator counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the coordinator's own activity
#[derive(Debug, Default)]
pub struct QuickPulseMetrics {
    pings: AtomicU64,
    posts: AtomicU64,
    errors: AtomicU64,
    redirects: AtomicU64,
}

/// Point-in-time view of [`QuickPulseMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuickPulseMetricsSnapshot {
    pub pings: u64,
    pub posts: u64,
    pub errors: u64,
    pub redirects: u64,
}

impl QuickPulseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ping(&self) {
        self.pings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_post(&self) {
        self.posts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QuickPulseMetricsSnapshot {
        QuickPulseMetricsSnapshot {
            pings: self.pings.load(Ordering::Relaxed),
            posts: self.posts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
        }
    }
}
