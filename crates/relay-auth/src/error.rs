//! Auth error types

use thiserror::Error;

/// Errors from token acquisition
#[derive(Debug, Error)]
pub enum AuthError {
    /// The fetcher could not produce a token
    #[error("token acquisition failed: {0}")]
    FetchFailed(String),

    /// The configured credential cannot be used in this environment
    #[error("credential unavailable: {0}")]
    Unavailable(String),
}
