//! Retry-After handling
//!
//! Throttling and transient-failure responses may carry `Retry-After`,
//! either as integer seconds or an HTTP-date. The parsed delay is capped
//! and published as a shared hint the drain loop consults before its next
//! tick.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Upper bound on any honored `Retry-After` value
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Parse a `Retry-After` header value, capped at [`MAX_RETRY_AFTER`]
///
/// Accepts integer seconds or an HTTP-date (RFC 2822). Dates in the past
/// yield a zero delay.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER));
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delay = (date.with_timezone(&chrono::Utc) - chrono::Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    Some(delay.min(MAX_RETRY_AFTER))
}

/// Shared "do not retry before" hint
///
/// Written by the channel when a response carries `Retry-After`; read by
/// the drain loop before each tick. Clears itself lazily once the deadline
/// passes.
#[derive(Default)]
pub struct RetryAfterHint {
    until: Mutex<Option<Instant>>,
}

impl RetryAfterHint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the hint out to at least `delay` from now
    ///
    /// An existing later deadline wins; hints only ever extend.
    pub fn defer(&self, delay: Duration) {
        let candidate = Instant::now() + delay.min(MAX_RETRY_AFTER);
        let mut until = self.until.lock();
        match *until {
            Some(existing) if existing >= candidate => {}
            _ => *until = Some(candidate),
        }
    }

    /// Time left before sending may resume, if any
    pub fn remaining(&self) -> Option<Duration> {
        let mut until = self.until.lock();
        match *until {
            Some(deadline) => {
                let now = Instant::now();
                if deadline > now {
                    Some(deadline - now)
                } else {
                    *until = None;
                    None
                }
            }
            None => None,
        }
    }
}
