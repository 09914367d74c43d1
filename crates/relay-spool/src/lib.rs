//! Relay spool - crash-safe on-disk FIFO of payloads awaiting retry
//!
//! The spool guarantees at-least-once delivery across network failure and
//! process restart. Payloads that could not be sent are persisted as
//! individual files and re-attempted by the drain loop.
//!
//! # Architecture
//!
//! ```text
//! [channel, on retry] → SpoolWriter ──→ <uuid>.tmp ──rename──→ <uuid>.trn
//!                            │                                     │
//!                            └──── publish ────→ SpoolIndex ←── startup scan
//!                                                     │
//! [drain loop] ←── PersistedFile ←── SpoolLoader ←── dequeue oldest
//! ```
//!
//! # Key Design
//!
//! - **Crash safety**: records are written to `.tmp`, fsynced, then renamed
//!   to `.trn`. A partial `.trn` is never observed; `.tmp` stragglers are
//!   swept on startup.
//! - **FIFO**: the index orders files by creation time, filename as
//!   tiebreak. Dequeued files are invisible to concurrent loads until
//!   reinstated or deleted.
//! - **Bounded retention**: total indexed bytes stay under a configurable
//!   cap (default 50 MiB); the oldest files are evicted to make room.
//! - **Single mutator**: all directory bookkeeping goes through the index;
//!   its critical sections are map updates only, disk I/O happens outside
//!   the lock.

mod error;
mod index;
mod loader;
mod metrics;
mod writer;

pub use error::SpoolError;
pub use index::{DEFAULT_RETENTION_CAP_BYTES, SpoolIndex, TMP_EXTENSION, TRN_EXTENSION};
pub use loader::{PersistedFile, SpoolLoader};
pub use metrics::{SpoolMetrics, SpoolMetricsSnapshot};
pub use writer::SpoolWriter;

/// Milliseconds since the Unix epoch
pub(crate) fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
