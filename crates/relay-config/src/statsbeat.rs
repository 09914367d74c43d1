//! Statsbeat (self-observability) configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Statsbeat reporting settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsbeatConfig {
    /// Whether the emitter runs
    pub enabled: bool,

    /// Snapshot-and-emit cadence
    /// Default: 15 minutes
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for StatsbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(15 * 60),
        }
    }
}

impl StatsbeatConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::invalid_value(
                "statsbeat.interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StatsbeatConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(900));
    }
}
