//! Channel error kinds
//!
//! Every kind is recovered at the channel boundary and mapped to a
//! [`SendOutcome`](crate::SendOutcome); nothing here reaches the producer.

use std::time::Duration;

use thiserror::Error;

/// Classified failure of one delivery attempt
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Connection refused, timeout, DNS failure, reset
    #[error("network failure: {0}")]
    TransientNetwork(String),

    /// Retryable server status (408, 429, 5xx in the retry set)
    #[error("server returned retryable status {status}")]
    ServerTransient {
        status: u16,
        retry_after: Option<Duration>,
    },

    /// 307/308 chain longer than the redirect limit
    #[error("redirect limit exhausted, last location {location}")]
    RedirectExhausted { location: String },

    /// 401/403 that survived the one fresh-token retry
    #[error("authorization rejected with status {0}")]
    AuthRejected(u16),

    /// Non-retryable 4xx
    #[error("ingestion rejected payload with status {0}")]
    ClientRejected(u16),

    /// Retry payload could not be persisted
    #[error("spool rejected retry payload: {0}")]
    SpoolFailed(#[from] relay_spool::SpoolError),

    /// Shutdown grace expired with the payload still in flight
    #[error("shutdown interrupted in-flight send, payload spooled")]
    ShutdownAbort,

    /// Channel could not be constructed from its configuration
    #[error("invalid channel configuration: {0}")]
    Config(String),
}

impl ChannelError {
    /// Stable label keying the rate-limited logger, one slot per kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransientNetwork(_) => "transient_network",
            Self::ServerTransient { .. } => "server_transient",
            Self::RedirectExhausted { .. } => "redirect_exhausted",
            Self::AuthRejected(_) => "auth_rejected",
            Self::ClientRejected(_) => "client_rejected",
            Self::SpoolFailed(_) => "spool_failed",
            Self::ShutdownAbort => "shutdown_abort",
            Self::Config(_) => "config",
        }
    }

    /// Whether the payload should be re-attempted via the spool
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork(_) | Self::ServerTransient { .. } | Self::RedirectExhausted { .. }
        )
    }
}
