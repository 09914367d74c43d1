//! Relay quickpulse - live-metrics coordinator
//!
//! QuickPulse is a low-latency side channel, independent of the main
//! delivery pipeline: a state machine that pings the live-metrics endpoint
//! until the service subscribes, then posts the current counter window at
//! a much faster cadence.
//!
//! ```text
//!           subscribed
//! PINGING ─────────────► POSTING
//!    ▲                      │
//!    └──────────────────────┘
//!     3× unsubscribed, 5xx, or network error (error backoff)
//! ```
//!
//! Failures here never reach the transmission channel; they are logged,
//! counted, and retried on the coordinator's own schedule.

mod coordinator;
mod error;
mod metrics;

pub use coordinator::{
    CoordinatorConfig, QuickPulseCoordinator, DEFAULT_ERROR_BACKOFF, DEFAULT_PING_INTERVAL,
    DEFAULT_POST_INTERVAL, MAX_CONSECUTIVE_UNSUBSCRIBED,
};
pub use error::QuickPulseError;
pub use metrics::{QuickPulseMetrics, QuickPulseMetricsSnapshot};
