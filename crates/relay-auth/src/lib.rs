//! Relay auth - opaque token source for ingestion authentication
//!
//! The channel never implements credential flows itself. A configured
//! [`TokenSource`] variant describes *which* credential to use; the actual
//! acquisition is delegated to an injected [`TokenFetcher`], the opaque
//! collaborator that must be callable concurrently.
//!
//! [`AuthHandle`] caches the most recent token and exposes `invalidate()`
//! so the channel can force a refresh after a 401/403.

mod error;
mod handle;
mod source;

pub use error::AuthError;
pub use handle::AuthHandle;
pub use source::{CredentialKind, Token, TokenFetcher, TokenRequest, TokenSource};

/// Default authentication scope for the monitoring ingestion service
pub const DEFAULT_AUTH_SCOPE: &str = "https://monitor.azure.com//.default";
