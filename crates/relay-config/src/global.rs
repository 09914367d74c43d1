//! Top-level agent configuration

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::AuthConfig;
use crate::error::ConfigError;
use crate::ingestion::IngestionConfig;
use crate::quickpulse::QuickPulseConfig;
use crate::spool::SpoolConfig;
use crate::statsbeat::StatsbeatConfig;

/// Shutdown behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long `flush_and_shutdown` may spend draining before giving up
    /// Default: 5 s
    #[serde(with = "humantime_serde")]
    pub grace: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
        }
    }
}

/// Complete configuration for the delivery subsystem
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub spool: SpoolConfig,
    pub ingestion: IngestionConfig,
    pub quickpulse: QuickPulseConfig,
    pub statsbeat: StatsbeatConfig,
    pub auth: AuthConfig,
    pub shutdown: ShutdownConfig,
}

impl AgentConfig {
    /// Parse from a TOML string, apply environment overrides, validate
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(s)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, apply environment overrides, validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Defaults plus environment overrides, validated
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `RELAY_*` environment variables on top of parsed values
    pub fn apply_env(&mut self) {
        self.spool.apply_env();
        self.ingestion.apply_env();
        self.quickpulse.apply_env();
        self.auth.apply_env();
    }

    /// Validate every section eagerly
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spool.validate()?;
        self.ingestion.validate()?;
        self.quickpulse.validate()?;
        self.statsbeat.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_valid() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert!(!config.auth.enabled);
        assert_eq!(config.shutdown.grace, Duration::from_secs(5));
    }

    #[test]
    fn test_full_config() {
        let config = AgentConfig::from_toml_str(
            r#"
[spool]
directory = "/data/spool"
retention_cap_bytes = 1048576

[ingestion]
endpoint = "https://ingest.example.com"
request_timeout = "10s"

[quickpulse]
enabled = false

[statsbeat]
interval = "5m"

[shutdown]
grace = "2s"
"#,
        )
        .unwrap();

        assert_eq!(config.spool.retention_cap_bytes, 1_048_576);
        assert_eq!(config.ingestion.endpoint, "https://ingest.example.com");
        assert!(!config.quickpulse.enabled);
        assert_eq!(config.statsbeat.interval, Duration::from_secs(300));
        assert_eq!(config.shutdown.grace, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_section_fails_load() {
        let result = AgentConfig::from_toml_str(
            r#"
[ingestion]
endpoint = "::not-a-url::"
"#,
        );
        assert!(result.is_err());
    }
}
