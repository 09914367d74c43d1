//! Drain loop - background re-sender for spooled payloads
//!
//! A single cooperative worker wakes on a jittered tick, consults the
//! `Retry-After` hint, and re-sends at most one spool file per tick so
//! live traffic is never starved. It holds only a weak handle to the
//! channel; when the channel is dropped the loop exits on its own.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::channel::TransmissionChannel;

/// Default interval between drain ticks
pub const DEFAULT_DRAIN_TICK: Duration = Duration::from_secs(30);

/// Default tick jitter, as a fraction of the interval
pub const DEFAULT_DRAIN_JITTER: f64 = 0.2;

/// Drain worker configuration
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// Base interval between ticks
    pub tick: Duration,

    /// Fractional jitter applied to each tick (0.2 = ±20%)
    pub jitter: f64,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_DRAIN_TICK,
            jitter: DEFAULT_DRAIN_JITTER,
        }
    }
}

impl DrainConfig {
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

/// Background worker that re-attempts spooled payloads
pub struct DrainLoop {
    channel: Weak<TransmissionChannel>,
    config: DrainConfig,
}

impl DrainLoop {
    /// Create a loop over a weak channel handle
    ///
    /// The weak handle breaks the ownership cycle: the channel owns the
    /// spool, the drain loop only borrows the channel.
    pub fn new(channel: Weak<TransmissionChannel>, config: DrainConfig) -> Self {
        Self { channel, config }
    }

    /// Run until shutdown fires or the channel is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<()>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.jittered_tick()) => {
                    let Some(channel) = self.channel.upgrade() else {
                        debug!("channel dropped, drain loop exiting");
                        return;
                    };
                    if let Some(remaining) = channel.retry_after_remaining() {
                        debug!(remaining_ms = remaining.as_millis() as u64, "drain tick deferred by retry-after");
                        continue;
                    }
                    // One file per tick; live traffic keeps priority
                    channel.drain_once().await;
                }
                _ = shutdown.changed() => {
                    debug!("drain loop stopped");
                    return;
                }
            }
        }
    }

    fn jittered_tick(&self) -> Duration {
        let spread = self.config.jitter.clamp(0.0, 1.0);
        let factor = 1.0 + spread * (rand::random::<f64>() * 2.0 - 1.0);
        self.config.tick.mul_f64(factor)
    }
}

#[cfg(test)]
#[path = "drain_test.rs"]
mod drain_test;
