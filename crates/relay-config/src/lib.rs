//! Relay configuration
//!
//! Configuration records for the delivery subsystem, loadable from TOML
//! with environment-variable overrides (`RELAY_*`). Validation is eager:
//! a config that parses but cannot work (bad URL, zero cap, malformed
//! proxy) fails at load time, not on first send.
//!
//! # Example
//!
//! ```toml
//! [spool]
//! directory = "/var/lib/relay/spool"
//! retention_cap_bytes = 52428800
//!
//! [ingestion]
//! endpoint = "https://dc.services.visualstudio.com"
//! request_timeout = "30s"
//!
//! [quickpulse]
//! endpoint = "https://rt.services.visualstudio.com"
//!
//! [auth]
//! enabled = false
//! ```

mod auth;
mod error;
mod global;
mod ingestion;
mod quickpulse;
mod spool;
mod statsbeat;

pub use auth::{AuthConfig, AuthMethod};
pub use error::ConfigError;
pub use global::{AgentConfig, ShutdownConfig};
pub use ingestion::IngestionConfig;
pub use quickpulse::QuickPulseConfig;
pub use spool::SpoolConfig;
pub use statsbeat::StatsbeatConfig;
