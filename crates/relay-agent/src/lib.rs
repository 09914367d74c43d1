//! Relay agent - producer-facing facade over the delivery subsystem
//!
//! Wires the spool, transmission channel, drain loop, statsbeat emitter,
//! and QuickPulse coordinator into one lifecycle:
//!
//! ```text
//!   Agent::prepare(config, fetcher)
//!        |
//!        v
//!   PreparedAgent::start(barrier)      startup scan + worker spawn
//!        |
//!        v
//!   AgentHandle ---- submit(payload, tenant)
//!        |
//!        `---------- flush_and_shutdown()   stop workers, drain spool
//! ```
//!
//! Producers only ever see [`AgentHandle`]; the channel, spool, and workers
//! stay internal. `flush_and_shutdown` stops workers in reverse start order
//! (QuickPulse first, since it has nothing to flush) and then drains the
//! spool within the configured grace period.

mod agent;
mod error;

pub use agent::{Agent, AgentHandle, PreparedAgent, STARTUP_BARRIER_TIMEOUT};
pub use error::AgentError;
