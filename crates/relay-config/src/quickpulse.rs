//! QuickPulse (live metrics) configuration

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Default live-metrics endpoint
pub const DEFAULT_QUICKPULSE_ENDPOINT: &str = "https://rt.services.visualstudio.com";

/// QuickPulse coordinator settings
///
/// # Defaults
///
/// - ping every 5 s while unsubscribed
/// - post every 1 s while subscribed
/// - back off 60 s after an error
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuickPulseConfig {
    /// Whether the coordinator runs at all
    pub enabled: bool,

    /// Base live-metrics URL (`/ping` and `/post` are appended)
    pub endpoint: String,

    /// Instrumentation key whose counters are reported
    ///
    /// The coordinator only runs when a key is configured.
    pub instrumentation_key: Option<String>,

    /// Wait between pings while unsubscribed
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,

    /// Wait between posts while subscribed
    #[serde(with = "humantime_serde")]
    pub post_interval: Duration,

    /// Wait before pinging again after an error
    #[serde(with = "humantime_serde")]
    pub error_backoff: Duration,
}

impl Default for QuickPulseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_QUICKPULSE_ENDPOINT.to_owned(),
            instrumentation_key: None,
            ping_interval: Duration::from_millis(5000),
            post_interval: Duration::from_millis(1000),
            error_backoff: Duration::from_millis(60000),
        }
    }
}

impl QuickPulseConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.endpoint)
            .map_err(|e| ConfigError::invalid_url("quickpulse.endpoint", e.to_string()))?;

        if let Some(key) = &self.instrumentation_key {
            relay_protocol::TenantKey::parse(key).map_err(|e| {
                ConfigError::invalid_value("quickpulse.instrumentation_key", e.to_string())
            })?;
        }

        for (field, value) in [
            ("quickpulse.ping_interval", self.ping_interval),
            ("quickpulse.post_interval", self.post_interval),
            ("quickpulse.error_backoff", self.error_backoff),
        ] {
            if value.is_zero() {
                return Err(ConfigError::invalid_value(field, "must be greater than zero"));
            }
        }
        Ok(())
    }

    pub(crate) fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("RELAY_QUICKPULSE_ENDPOINT") {
            self.endpoint = endpoint;
        }
    }
}
