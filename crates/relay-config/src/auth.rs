//! Authentication configuration

use relay_auth::TokenSource;
use serde::Deserialize;

use crate::error::ConfigError;

/// Authentication settings
///
/// # Example
///
/// ```toml
/// [auth]
/// enabled = true
/// method = "managed-identity-client-id"
/// client_id = "11111111-2222-3333-4444-555555555555"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether bearer tokens are attached to ingestion requests
    pub enabled: bool,

    /// Which credential flow to use (required when enabled)
    #[serde(flatten)]
    pub method: Option<AuthMethod>,
}

/// Configured credential flow
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum AuthMethod {
    /// User-assigned managed identity
    ManagedIdentityClientId { client_id: String },

    /// System-assigned managed identity
    ManagedIdentitySystem,

    /// Client id + secret
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
        authority_host: Option<String>,
    },

    /// Caller-supplied token fetcher
    External,
}

impl AuthConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.method.is_none() {
            return Err(ConfigError::MissingAuthMethod);
        }
        Ok(())
    }

    pub(crate) fn apply_env(&mut self) {
        if let Ok(enabled) = std::env::var("RELAY_AUTH_ENABLED") {
            self.enabled = matches!(enabled.as_str(), "1" | "true" | "yes");
        }
    }

    /// The token source for the configured method, if auth is enabled
    pub fn token_source(&self) -> Option<TokenSource> {
        if !self.enabled {
            return None;
        }
        self.method.as_ref().map(|method| match method {
            AuthMethod::ManagedIdentityClientId { client_id } => {
                TokenSource::ManagedIdentityByClientId {
                    client_id: client_id.clone(),
                }
            }
            AuthMethod::ManagedIdentitySystem => TokenSource::ManagedIdentitySystem,
            AuthMethod::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
                authority_host,
            } => TokenSource::ClientSecret {
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                authority_host: authority_host.clone(),
            },
            AuthMethod::External => TokenSource::External,
        })
    }
}
