//! Agent lifecycle errors

use thiserror::Error;

/// Everything that can stop the agent from preparing or starting
///
/// The live send path never surfaces errors; once started, delivery
/// failures resolve to outcomes and counters instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] relay_config::ConfigError),

    #[error(transparent)]
    Spool(#[from] relay_spool::SpoolError),

    #[error(transparent)]
    Channel(#[from] relay_channel::ChannelError),

    #[error(transparent)]
    QuickPulse(#[from] relay_quickpulse::QuickPulseError),

    #[error(transparent)]
    InvalidTenant(#[from] relay_protocol::CodecError),

    /// Auth is enabled but no [`relay_auth::TokenFetcher`] was injected
    #[error("authentication is enabled but no token fetcher was provided")]
    MissingTokenFetcher,

    #[error("unusable endpoint: {0}")]
    InvalidEndpoint(String),
}
