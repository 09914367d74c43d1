//! Token source variants and the fetcher seam

use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::AuthError;

/// A bearer token plus optional expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Raw token value placed into the Authorization header
    pub value: String,

    /// When the token stops being valid, if known
    pub expires_at: Option<SystemTime>,
}

impl Token {
    /// Create a token without expiry metadata
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Whether the token is past its expiry (tokens without expiry never are)
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| SystemTime::now() >= at)
            .unwrap_or(false)
    }
}

/// Which credential flow a [`TokenRequest`] describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialKind {
    /// User-assigned managed identity
    ManagedIdentityByClientId {
        /// Client id of the identity
        client_id: String,
    },

    /// System-assigned managed identity
    ManagedIdentitySystem,

    /// Client id + secret against a tenant
    ClientSecret {
        /// Directory (tenant) id
        tenant_id: String,
        /// Application client id
        client_id: String,
        /// Application secret
        client_secret: String,
        /// Authority host override, if any
        authority_host: Option<String>,
    },

    /// Caller-supplied credential the fetcher already knows how to satisfy
    External,
}

/// Everything a fetcher needs to acquire one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    /// Scope the token is requested for
    pub scope: String,

    /// Credential flow to use
    pub credential: CredentialKind,
}

/// The opaque token acquisition collaborator
///
/// Implementations must be callable concurrently; the caller caches at most
/// one token per request.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    /// Acquire a token for the given request
    async fn fetch(&self, request: &TokenRequest) -> Result<Token, AuthError>;
}

/// Configured authentication method
///
/// Dispatch is a tagged switch over the variants: [`TokenSource::request`]
/// packages the variant's parameters into a [`TokenRequest`] for the
/// injected fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// User-assigned managed identity selected by client id
    ManagedIdentityByClientId { client_id: String },

    /// System-assigned managed identity
    ManagedIdentitySystem,

    /// Client secret credential
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
        authority_host: Option<String>,
    },

    /// Externally managed credential
    External,
}

impl TokenSource {
    /// Build the token request for this source
    pub fn request(&self, scope: &str) -> TokenRequest {
        let credential = match self {
            TokenSource::ManagedIdentityByClientId { client_id } => {
                CredentialKind::ManagedIdentityByClientId {
                    client_id: client_id.clone(),
                }
            }
            TokenSource::ManagedIdentitySystem => CredentialKind::ManagedIdentitySystem,
            TokenSource::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
                authority_host,
            } => CredentialKind::ClientSecret {
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                authority_host: authority_host.clone(),
            },
            TokenSource::External => CredentialKind::External,
        };
        TokenRequest {
            scope: scope.to_owned(),
            credential,
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::ManagedIdentityByClientId { .. } => f.write_str("managed-identity-client-id"),
            TokenSource::ManagedIdentitySystem => f.write_str("managed-identity-system"),
            TokenSource::ClientSecret { .. } => f.write_str("client-secret"),
            TokenSource::External => f.write_str("external"),
        }
    }
}
