//! Rate-limited error logging
//!
//! Prevents log spam when the endpoint is down and every send fails the
//! same way: at most one line per error kind per interval, with a count of
//! suppressed occurrences when the next line is emitted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default minimum interval between log lines of the same kind
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct KindState {
    last_log: Option<Instant>,
    suppressed: u64,
    total: u64,
}

/// Logger that emits at most one line per error kind per interval
///
/// Thread-safe; the per-kind bookkeeping sits behind a single mutex since
/// errors are rare relative to sends.
pub struct RateLimitedLogger {
    min_interval: Duration,
    kinds: Mutex<HashMap<&'static str, KindState>>,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            kinds: Mutex::new(HashMap::new()),
        }
    }

    /// Record an error; log it unless the kind logged within the interval
    ///
    /// Returns true if a line was emitted.
    pub fn error(&self, kind: &'static str, error: &dyn std::fmt::Display) -> bool {
        let (should_log, suppressed, total) = {
            let mut kinds = self.kinds.lock();
            let state = kinds.entry(kind).or_default();
            state.total += 1;
            let now = Instant::now();

            let due = match state.last_log {
                None => true,
                Some(last) => now.duration_since(last) >= self.min_interval,
            };

            if due {
                let suppressed = state.suppressed;
                state.suppressed = 0;
                state.last_log = Some(now);
                (true, suppressed, state.total)
            } else {
                state.suppressed += 1;
                (false, 0, state.total)
            }
        };

        if should_log {
            if suppressed > 0 {
                tracing::error!(
                    kind,
                    error = %error,
                    suppressed_count = suppressed,
                    total_errors = total,
                    "send error (rate-limited)"
                );
            } else {
                tracing::error!(kind, error = %error, total_errors = total, "send error");
            }
        }
        should_log
    }

    /// Errors of this kind suppressed since the last emitted line
    pub fn suppressed_count(&self, kind: &str) -> u64 {
        self.kinds.lock().get(kind).map_or(0, |s| s.suppressed)
    }

    /// Errors of this kind ever recorded
    pub fn total_count(&self, kind: &str) -> u64 {
        self.kinds.lock().get(kind).map_or(0, |s| s.total)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
