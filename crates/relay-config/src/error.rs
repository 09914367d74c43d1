//! Configuration error types

use std::io;

use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A URL field does not parse
    #[error("{field} is not a valid URL: {message}")]
    InvalidUrl {
        /// Field name
        field: &'static str,
        /// Parser message
        message: String,
    },

    /// A field value is out of range or malformed
    #[error("invalid {field}: {message}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// What was wrong
        message: String,
    },

    /// Authentication enabled but no method configured
    #[error("auth.enabled is true but no method is configured")]
    MissingAuthMethod,
}

impl ConfigError {
    pub(crate) fn invalid_url(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_value(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
