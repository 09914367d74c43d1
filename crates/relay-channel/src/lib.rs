//! Relay channel - sends telemetry batches to the ingestion endpoint
//!
//! The transmission channel is the single network boundary of the delivery
//! pipeline. It resolves the effective URL through the redirect cache,
//! POSTs the gzipped batch, classifies the response, and either resolves
//! success, spools the payload for retry, or drops it.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─ RedirectCache (tenant → URL, TTL)
//! submit ──► TransmissionChannel ──► ingestion endpoint
//!                    │   ▲
//!              spool │   │ resend
//!                    ▼   │
//!                SpoolWriter/Loader ◄── DrainLoop (weak handle, jittered tick)
//! ```
//!
//! Every producer-facing future resolves to one of
//! [`SendOutcome::Success`], [`SendOutcome::RetryWillSpool`], or
//! [`SendOutcome::FailureDropped`]; no error escapes the channel boundary.

mod channel;
mod drain;
mod error;
mod logger;
mod redirect;
mod retry;

pub use channel::{ChannelConfig, SendOutcome, TransmissionChannel, MAX_REDIRECTS, TRACK_PATH};
pub use drain::{DrainConfig, DrainLoop, DEFAULT_DRAIN_JITTER, DEFAULT_DRAIN_TICK};
pub use error::ChannelError;
pub use logger::{RateLimitedLogger, DEFAULT_LOG_INTERVAL};
pub use redirect::{RedirectCache, DEFAULT_REDIRECT_CAPACITY, DEFAULT_REDIRECT_TTL};
pub use retry::{parse_retry_after, RetryAfterHint, MAX_RETRY_AFTER};
