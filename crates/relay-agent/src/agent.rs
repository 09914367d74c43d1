//! Agent lifecycle - prepare, start, submit, flush-and-shutdown

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use relay_auth::{AuthHandle, TokenFetcher, DEFAULT_AUTH_SCOPE};
use relay_channel::{ChannelConfig, DrainConfig, DrainLoop, SendOutcome, TransmissionChannel};
use relay_config::AgentConfig;
use relay_protocol::TenantKey;
use relay_quickpulse::{CoordinatorConfig, QuickPulseCoordinator};
use relay_spool::{SpoolIndex, SpoolMetrics};
use relay_statsbeat::{NetworkStatsbeat, StatsbeatEmitter, StatsbeatSubmitter};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AgentError;

/// How long `start` waits on the caller's readiness barrier before
/// proceeding anyway
pub const STARTUP_BARRIER_TIMEOUT: Duration = Duration::from_secs(120);

/// Entry point: validates configuration and builds the wiring
pub struct Agent;

impl Agent {
    /// Validate the configuration and construct the (not yet running)
    /// delivery pipeline
    ///
    /// A token fetcher is required exactly when auth is enabled; passing
    /// one with auth disabled is harmless and ignored.
    pub fn prepare(
        config: AgentConfig,
        fetcher: Option<Arc<dyn TokenFetcher>>,
    ) -> Result<PreparedAgent, AgentError> {
        config.validate()?;

        let auth = match config.auth.token_source() {
            Some(source) => {
                let fetcher = fetcher.ok_or(AgentError::MissingTokenFetcher)?;
                Some(AuthHandle::new(source, fetcher, DEFAULT_AUTH_SCOPE))
            }
            None => None,
        };

        let endpoint = Url::parse(&config.ingestion.endpoint)
            .map_err(|e| AgentError::InvalidEndpoint(format!("{}: {e}", config.ingestion.endpoint)))?;

        let index = Arc::new(SpoolIndex::new(
            config.spool.directory.clone(),
            config.spool.retention_cap_bytes,
        )?);
        let stats = Arc::new(NetworkStatsbeat::new());

        let mut channel_config = ChannelConfig::default()
            .with_endpoint(endpoint)
            .with_api_version(config.ingestion.api_version.clone())
            .with_request_timeout(config.ingestion.request_timeout);
        if let Some(proxy) = &config.ingestion.proxy {
            channel_config = channel_config.with_proxy(proxy.clone());
        }

        let channel = Arc::new(TransmissionChannel::new(
            channel_config,
            Arc::clone(&index),
            Arc::clone(&stats),
            auth,
        )?);

        Ok(PreparedAgent {
            config,
            index,
            stats,
            channel,
            drain: DrainConfig::default(),
        })
    }
}

/// A validated, wired, not-yet-running agent
pub struct PreparedAgent {
    config: AgentConfig,
    index: Arc<SpoolIndex>,
    stats: Arc<NetworkStatsbeat>,
    channel: Arc<TransmissionChannel>,
    drain: DrainConfig,
}

impl PreparedAgent {
    /// Override the drain cadence (mostly useful in tests)
    #[must_use]
    pub fn with_drain_config(mut self, drain: DrainConfig) -> Self {
        self.drain = drain;
        self
    }

    /// Recover the spool and spawn the background workers
    ///
    /// When a barrier is given, startup waits for it (the host signals
    /// readiness, e.g. after its own warmup) but proceeds after
    /// [`STARTUP_BARRIER_TIMEOUT`] or if the sender is dropped, so a
    /// misbehaving host cannot wedge delivery forever.
    pub async fn start(self, barrier: Option<oneshot::Receiver<()>>) -> Result<AgentHandle, AgentError> {
        if let Some(barrier) = barrier {
            match tokio::time::timeout(STARTUP_BARRIER_TIMEOUT, barrier).await {
                Ok(Ok(())) => debug!("startup barrier released"),
                Ok(Err(_)) => warn!("startup barrier dropped without signal, proceeding"),
                Err(_) => warn!(
                    timeout_secs = STARTUP_BARRIER_TIMEOUT.as_secs(),
                    "startup barrier timed out, proceeding"
                ),
            }
        }

        let recovered = self.index.startup_scan()?;
        info!(recovered, "agent starting");

        let mut workers = Vec::new();

        let drain = DrainLoop::new(Arc::downgrade(&self.channel), self.drain.clone());
        workers.push(Worker::spawn("drain", |shutdown| drain.run(shutdown)));

        if self.config.statsbeat.enabled {
            let emitter = StatsbeatEmitter::new(
                Arc::clone(&self.stats),
                Arc::new(ChannelSubmitter {
                    channel: Arc::clone(&self.channel),
                }),
                self.config.statsbeat.interval,
            );
            workers.push(Worker::spawn("statsbeat", |shutdown| emitter.run(shutdown)));
        }

        if self.config.quickpulse.enabled {
            // The coordinator needs a tenant to report; without a key the
            // rest of the agent runs normally.
            if let Some(key) = &self.config.quickpulse.instrumentation_key {
                let tenant = TenantKey::parse(key)?;
                let endpoint = Url::parse(&self.config.quickpulse.endpoint)
                    .map_err(|e| AgentError::InvalidEndpoint(format!("{}: {e}", self.config.quickpulse.endpoint)))?;
                let coordinator_config = CoordinatorConfig::new(endpoint, tenant)
                    .with_ping_interval(self.config.quickpulse.ping_interval)
                    .with_post_interval(self.config.quickpulse.post_interval)
                    .with_error_backoff(self.config.quickpulse.error_backoff);
                let coordinator =
                    QuickPulseCoordinator::new(coordinator_config, Arc::clone(&self.stats))?;
                workers.push(Worker::spawn("quickpulse", |shutdown| coordinator.run(shutdown)));
            } else {
                debug!("quickpulse enabled but no instrumentation key configured, skipping");
            }
        }

        Ok(AgentHandle {
            channel: self.channel,
            stats: self.stats,
            workers: Mutex::new(workers),
            grace: self.config.shutdown.grace,
        })
    }
}

/// Running agent: the producer-facing surface
pub struct AgentHandle {
    channel: Arc<TransmissionChannel>,
    stats: Arc<NetworkStatsbeat>,
    workers: Mutex<Vec<Worker>>,
    grace: Duration,
}

impl AgentHandle {
    /// Submit one gzipped JSON-lines batch for delivery
    ///
    /// Never fails: the batch is delivered, spooled for retry, or dropped,
    /// and the outcome says which. After shutdown has begun, submissions go
    /// straight to the spool.
    pub async fn submit(&self, payload: Bytes, tenant: &TenantKey) -> SendOutcome {
        self.channel.send_raw_bytes(payload, tenant).await
    }

    /// Stop workers, then drain the spool within the configured grace period
    ///
    /// Returns whether the spool fully drained. Idempotent: a second call
    /// finds no workers and an already-settled spool.
    pub async fn flush_and_shutdown(&self) -> bool {
        self.flush_and_shutdown_within(self.grace).await
    }

    /// Like [`flush_and_shutdown`], with an explicit grace period
    ///
    /// [`flush_and_shutdown`]: AgentHandle::flush_and_shutdown
    pub async fn flush_and_shutdown_within(&self, grace: Duration) -> bool {
        self.channel.begin_shutdown();

        // Reverse start order: quickpulse and statsbeat go first, the
        // drain loop last, so nothing re-checks files out mid-teardown.
        let workers: Vec<Worker> = {
            let mut guard = self.workers.lock();
            guard.drain(..).collect()
        };
        for worker in workers.into_iter().rev() {
            worker.stop().await;
        }

        let deadline = tokio::time::Instant::now() + grace;
        let drained = self.channel.flush_spool(deadline).await;
        info!(drained, remaining = self.channel.spool_len(), "agent shut down");
        drained && self.channel.spool_is_empty()
    }

    /// Names of the currently running workers, in start order
    pub fn worker_names(&self) -> Vec<&'static str> {
        self.workers.lock().iter().map(|w| w.name).collect()
    }

    /// Shared delivery counters
    pub fn stats(&self) -> Arc<NetworkStatsbeat> {
        Arc::clone(&self.stats)
    }

    /// Shared spool metrics
    pub fn spool_metrics(&self) -> Arc<SpoolMetrics> {
        self.channel.spool_metrics()
    }

    pub fn spool_len(&self) -> usize {
        self.channel.spool_len()
    }

    pub fn spool_is_empty(&self) -> bool {
        self.channel.spool_is_empty()
    }

    pub fn spool_total_bytes(&self) -> u64 {
        self.channel.spool_total_bytes()
    }
}

/// A spawned background worker and its shutdown signal
struct Worker {
    name: &'static str,
    shutdown: watch::Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: FnOnce(watch::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown, receiver) = watch::channel(());
        let handle = tokio::spawn(run(receiver));
        debug!(worker = name, "worker started");
        Self {
            name,
            shutdown,
            handle,
        }
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            warn!(worker = self.name, error = %e, "worker did not stop cleanly");
        } else {
            debug!(worker = self.name, "worker stopped");
        }
    }
}

/// Forwards statsbeat batches through the channel with the statsbeat flag
struct ChannelSubmitter {
    channel: Arc<TransmissionChannel>,
}

#[async_trait]
impl StatsbeatSubmitter for ChannelSubmitter {
    async fn submit(&self, tenant: &TenantKey, body: Bytes) -> bool {
        self.channel.send_statsbeat(body, tenant).await == SendOutcome::Success
    }
}

#[cfg(test)]
#[path = "agent_test.rs"]
mod agent_test;
