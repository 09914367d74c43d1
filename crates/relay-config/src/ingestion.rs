//! Ingestion endpoint configuration

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Default public ingestion endpoint
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// API version sent on every track request
pub const DEFAULT_API_VERSION: &str = "2020-09-15_Preview";

/// Ingestion endpoint and request behavior
///
/// # Example
///
/// ```toml
/// [ingestion]
/// endpoint = "https://dc.services.visualstudio.com"
/// request_timeout = "30s"
/// proxy = "proxy.internal:3128"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Base ingestion URL (the `/v2.1/track` path is appended)
    pub endpoint: String,

    /// API version query parameter
    pub api_version: String,

    /// Hard per-attempt timeout
    /// Default: 30 s
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Optional HTTP proxy as `host:port`
    pub proxy: Option<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INGESTION_ENDPOINT.to_owned(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            request_timeout: Duration::from_secs(30),
            proxy: None,
        }
    }
}

impl IngestionConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.endpoint)
            .map_err(|e| ConfigError::invalid_url("ingestion.endpoint", e.to_string()))?;

        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "ingestion.request_timeout",
                "must be greater than zero",
            ));
        }

        if let Some(proxy) = &self.proxy {
            validate_proxy(proxy)?;
        }
        Ok(())
    }

    pub(crate) fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("RELAY_INGESTION_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(secs) = std::env::var("RELAY_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.request_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(proxy) = std::env::var("RELAY_PROXY") {
            self.proxy = Some(proxy);
        }
    }
}

/// Check the `host:port` shape without resolving anything
fn validate_proxy(proxy: &str) -> Result<(), ConfigError> {
    let Some((host, port)) = proxy.rsplit_once(':') else {
        return Err(ConfigError::invalid_value(
            "ingestion.proxy",
            format!("expected host:port, got '{proxy}'"),
        ));
    };
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(ConfigError::invalid_value(
            "ingestion.proxy",
            format!("expected host:port, got '{proxy}'"),
        ));
    }
    Ok(())
}
