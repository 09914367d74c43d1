//! Spool configuration

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default retention cap: 50 MiB
pub const DEFAULT_RETENTION_CAP_BYTES: u64 = 50 * 1024 * 1024;

/// Spool directory and retention settings
///
/// # Example
///
/// ```toml
/// [spool]
/// directory = "/var/lib/relay/spool"
/// retention_cap_bytes = 52428800
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpoolConfig {
    /// Directory spool files are written to
    /// Default: `<agent dir>/spool`
    pub directory: PathBuf,

    /// Total on-disk byte cap; oldest files are evicted to stay under it
    /// Default: 50 MiB
    pub retention_cap_bytes: u64,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            directory: default_spool_dir(),
            retention_cap_bytes: DEFAULT_RETENTION_CAP_BYTES,
        }
    }
}

impl SpoolConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_cap_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "spool.retention_cap_bytes",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub(crate) fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("RELAY_SPOOL_DIR") {
            self.directory = PathBuf::from(dir);
        }
        if let Ok(cap) = std::env::var("RELAY_RETENTION_CAP_BYTES") {
            if let Ok(cap) = cap.parse() {
                self.retention_cap_bytes = cap;
            }
        }
    }
}

/// `${AGENT_DIR}/spool`, falling back to a path under the temp dir
fn default_spool_dir() -> PathBuf {
    std::env::var("AGENT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("relay"))
        .join("spool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SpoolConfig::default();
        assert_eq!(config.retention_cap_bytes, DEFAULT_RETENTION_CAP_BYTES);
        assert!(config.directory.ends_with("spool"));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = SpoolConfig {
            retention_cap_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize() {
        let config: SpoolConfig = toml::from_str(
            r#"
directory = "/data/spool"
retention_cap_bytes = 1024
"#,
        )
        .unwrap();
        assert_eq!(config.directory, PathBuf::from("/data/spool"));
        assert_eq!(config.retention_cap_bytes, 1024);
    }
}
