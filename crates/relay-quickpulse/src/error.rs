//! QuickPulse error kinds

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuickPulseError {
    /// Coordinator configuration failed eager validation
    #[error("invalid quickpulse configuration: {0}")]
    InvalidConfig(String),

    /// Connection-level failure (refused, timeout, DNS)
    #[error("network failure: {0}")]
    Network(String),

    /// Non-success status from the live-metrics service
    #[error("service returned status {0}")]
    ServerStatus(u16),
}
