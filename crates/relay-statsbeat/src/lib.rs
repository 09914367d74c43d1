//! Relay statsbeat - counters the agent emits about its own delivery
//!
//! The transmission channel records every request outcome here. On a fixed
//! cadence (default 15 minutes) the emitter snapshots and resets the
//! counters, serializes them as a gzipped JSON-lines batch, and submits it
//! back through the same channel - tagged as statsbeat so a failing
//! statsbeat send never generates statsbeat about itself.

mod counters;
mod emitter;

pub use counters::{NetworkStatsbeat, TenantCounters, TenantSnapshot};
pub use emitter::{StatsbeatEmitter, StatsbeatSubmitter};
