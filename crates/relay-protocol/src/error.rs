//! Codec error types

use thiserror::Error;

/// Errors from encoding or decoding spool envelopes
#[derive(Debug, Error)]
pub enum CodecError {
    /// Record is shorter than the fixed header
    #[error("truncated envelope: {len} bytes, header needs {expected}")]
    Truncated {
        /// Actual record length
        len: usize,
        /// Minimum length required
        expected: usize,
    },

    /// Version byte is not one this build understands
    #[error("unsupported envelope version {0:#04x}")]
    UnsupportedVersion(u8),

    /// Tenant key bytes are not a valid instrumentation key
    #[error("invalid tenant key: {0}")]
    InvalidTenantKey(String),
}
