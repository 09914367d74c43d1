//! Spool metrics
//!
//! Thread-safe counters updated by the writer, loader, and index.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the spool subsystem
#[derive(Debug, Default)]
pub struct SpoolMetrics {
    /// Files durably written
    pub files_written: AtomicU64,

    /// Bytes durably written (headers included)
    pub bytes_written: AtomicU64,

    /// Files handed to a sender
    pub files_loaded: AtomicU64,

    /// Unreadable or invalid files deleted on load
    pub corrupt_files: AtomicU64,

    /// Files evicted to keep the retention cap
    pub retention_drops: AtomicU64,

    /// Failed write attempts
    pub write_errors: AtomicU64,
}

impl SpoolMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            files_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            files_loaded: AtomicU64::new(0),
            corrupt_files: AtomicU64::new(0),
            retention_drops: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_written(&self, bytes: u64) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_loaded(&self) {
        self.files_loaded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_corrupt(&self) {
        self.corrupt_files.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retention_drop(&self, count: u64) {
        self.retention_drops.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> SpoolMetricsSnapshot {
        SpoolMetricsSnapshot {
            files_written: self.files_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            files_loaded: self.files_loaded.load(Ordering::Relaxed),
            corrupt_files: self.corrupt_files.load(Ordering::Relaxed),
            retention_drops: self.retention_drops.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of spool metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpoolMetricsSnapshot {
    pub files_written: u64,
    pub bytes_written: u64,
    pub files_loaded: u64,
    pub corrupt_files: u64,
    pub retention_drops: u64,
    pub write_errors: u64,
}
