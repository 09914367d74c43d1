//! Cached token handle
//!
//! Wraps a token source and fetcher, caching the most recent token so the
//! hot send path does not re-acquire per request. `invalidate()` clears the
//! cache; the channel calls it before its single retry on 401/403.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::AuthError;
use crate::source::{Token, TokenFetcher, TokenSource};

/// Shared, cloneable auth state for the transmission channel
#[derive(Clone)]
pub struct AuthHandle {
    source: TokenSource,
    fetcher: Arc<dyn TokenFetcher>,
    scope: String,
    cached: Arc<ArcSwap<Option<Token>>>,
}

impl AuthHandle {
    /// Create a handle for a source/fetcher pair
    pub fn new(source: TokenSource, fetcher: Arc<dyn TokenFetcher>, scope: impl Into<String>) -> Self {
        Self {
            source,
            fetcher,
            scope: scope.into(),
            cached: Arc::new(ArcSwap::from_pointee(None)),
        }
    }

    /// Return a valid bearer token, fetching if none is cached
    pub async fn bearer(&self) -> Result<Token, AuthError> {
        if let Some(token) = self.cached.load().as_ref() {
            if !token.is_expired() {
                return Ok(token.clone());
            }
        }

        let request = self.source.request(&self.scope);
        let token = self.fetcher.fetch(&request).await?;
        self.cached.store(Arc::new(Some(token.clone())));
        tracing::debug!(source = %self.source, "acquired fresh bearer token");
        Ok(token)
    }

    /// Drop the cached token so the next `bearer()` fetches fresh
    pub fn invalidate(&self) {
        self.cached.store(Arc::new(None));
    }
}
