//! Transmission channel - send, classify, retry or spool
//!
//! Owns the HTTP client, the redirect cache, and the spool (single-owner;
//! the drain loop only ever holds a weak handle back to the channel). The
//! send path never raises: every attempt resolves to a [`SendOutcome`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use relay_auth::AuthHandle;
use relay_protocol::TenantKey;
use relay_spool::{PersistedFile, SpoolIndex, SpoolLoader, SpoolWriter};
use relay_statsbeat::NetworkStatsbeat;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use tokio::sync::watch;
use url::Url;

use crate::error::ChannelError;
use crate::logger::RateLimitedLogger;
use crate::redirect::{RedirectCache, DEFAULT_REDIRECT_CAPACITY, DEFAULT_REDIRECT_TTL};
use crate::retry::{parse_retry_after, RetryAfterHint};

/// Ingestion track path, appended to the effective base URL
pub const TRACK_PATH: &str = "v2.1/track";

/// Maximum 307/308 hops followed within one attempt
pub const MAX_REDIRECTS: usize = 10;

const DEFAULT_ENDPOINT: &str = "https://dc.services.visualstudio.com";
const DEFAULT_API_VERSION: &str = "2020-09-15_Preview";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolution of one producer-facing send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Ingestion accepted the batch (200, or 206 partial)
    Success,

    /// The batch was persisted to the spool for the drain loop
    RetryWillSpool,

    /// The batch was dropped permanently
    FailureDropped,
}

/// Channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base ingestion URL
    pub endpoint: Url,

    /// `api-version` query parameter
    pub api_version: String,

    /// Hard per-attempt timeout
    pub request_timeout: Duration,

    /// Optional HTTP proxy, `host:port`
    pub proxy: Option<String>,

    /// Lifetime of cached redirects
    pub redirect_ttl: Duration,

    /// Capacity of the redirect cache
    pub redirect_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            api_version: DEFAULT_API_VERSION.to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            proxy: None,
            redirect_ttl: DEFAULT_REDIRECT_TTL,
            redirect_capacity: DEFAULT_REDIRECT_CAPACITY,
        }
    }
}

impl ChannelConfig {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    #[must_use]
    pub fn with_redirect_ttl(mut self, ttl: Duration) -> Self {
        self.redirect_ttl = ttl;
        self
    }
}

enum Delivered {
    Full,
    Partial,
}

/// The sender: resolves URLs, POSTs batches, classifies responses
pub struct TransmissionChannel {
    config: ChannelConfig,
    client: reqwest::Client,
    index: Arc<SpoolIndex>,
    writer: SpoolWriter,
    loader: SpoolLoader,
    redirects: RedirectCache,
    retry_hint: RetryAfterHint,
    auth: Option<AuthHandle>,
    stats: Arc<NetworkStatsbeat>,
    logger: RateLimitedLogger,
    shutdown: watch::Sender<bool>,
}

impl TransmissionChannel {
    /// Build a channel over a spool index
    ///
    /// Fails eagerly on an unusable proxy or HTTP client configuration.
    pub fn new(
        config: ChannelConfig,
        index: Arc<SpoolIndex>,
        stats: Arc<NetworkStatsbeat>,
        auth: Option<AuthHandle>,
    ) -> Result<Self, ChannelError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout)
            // 307/308 are interpreted by the channel so the redirect
            // cache sees them; the client must not follow on its own.
            .redirect(reqwest::redirect::Policy::none());

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(format!("http://{proxy}"))
                .map_err(|e| ChannelError::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ChannelError::Config(format!("failed to build HTTP client: {e}")))?;

        let redirects = RedirectCache::new(config.redirect_capacity);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            client,
            writer: SpoolWriter::new(Arc::clone(&index)),
            loader: SpoolLoader::new(Arc::clone(&index)),
            index,
            redirects,
            retry_hint: RetryAfterHint::new(),
            auth,
            stats,
            logger: RateLimitedLogger::default(),
            shutdown,
        })
    }

    /// Send a live batch; on failure the payload is spooled or dropped
    pub async fn send_raw_bytes(&self, payload: Bytes, tenant: &TenantKey) -> SendOutcome {
        self.dispatch(payload, tenant, false).await
    }

    /// Send a statsbeat batch
    ///
    /// Failures are dropped silently: statsbeat is never spooled and never
    /// feeds its own counters, so a broken endpoint cannot generate
    /// statsbeat about statsbeat.
    pub async fn send_statsbeat(&self, payload: Bytes, tenant: &TenantKey) -> SendOutcome {
        self.dispatch(payload, tenant, true).await
    }

    /// Load and re-send one spooled file
    ///
    /// Returns `None` when the spool has nothing queued. On success or
    /// permanent failure the file is deleted; on a retryable failure it is
    /// reinstated with its original position.
    pub async fn drain_once(&self) -> Option<SendOutcome> {
        let file = self.loader.load_oldest()?;
        let outcome = self.resend_spooled(&file).await;
        self.loader
            .update_processed_file_status(&file.filename, outcome != SendOutcome::RetryWillSpool);
        Some(outcome)
    }

    /// Drain the spool until empty, the endpoint asks for retry, or the
    /// deadline passes. Returns whether the spool fully drained.
    pub async fn flush_spool(&self, deadline: tokio::time::Instant) -> bool {
        loop {
            if self.index.is_empty() {
                return true;
            }
            let outcome = match tokio::time::timeout_at(deadline, self.drain_once()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.logger.error("shutdown_abort", &ChannelError::ShutdownAbort);
                    return false;
                }
            };
            match outcome {
                // Nothing queued but something may still be checked out
                None => return self.index.is_empty(),
                // Endpoint still failing; the payload stays spooled
                Some(SendOutcome::RetryWillSpool) => return false,
                Some(_) => {}
            }
        }
    }

    /// Stop accepting live sends; in-flight attempts spool their payloads
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Persist a payload directly to the spool, bypassing the network
    pub fn spool_payload(&self, payload: &[u8], tenant: &TenantKey) -> SendOutcome {
        self.spool_for_retry(payload, tenant, true)
    }

    /// Time left on the most recent `Retry-After`, if any
    pub fn retry_after_remaining(&self) -> Option<Duration> {
        self.retry_hint.remaining()
    }

    pub fn spool_len(&self) -> usize {
        self.index.len()
    }

    pub fn spool_is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn spool_total_bytes(&self) -> u64 {
        self.index.total_bytes()
    }

    /// Shared outcome counters
    pub fn stats(&self) -> Arc<NetworkStatsbeat> {
        Arc::clone(&self.stats)
    }

    /// Shared spool metrics
    pub fn spool_metrics(&self) -> Arc<relay_spool::SpoolMetrics> {
        self.index.metrics()
    }

    async fn dispatch(&self, payload: Bytes, tenant: &TenantKey, statsbeat: bool) -> SendOutcome {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return self.abort_for_shutdown(&payload, tenant, statsbeat);
        }

        let start = Instant::now();
        let result = tokio::select! {
            result = self.attempt(&payload, tenant) => result,
            _ = shutdown.wait_for(|stopped| *stopped) => {
                return self.abort_for_shutdown(&payload, tenant, statsbeat);
            }
        };

        match result {
            Ok(delivered) => {
                if !statsbeat {
                    self.record_delivery(&delivered, tenant, payload.len() as u64, start);
                }
                SendOutcome::Success
            }
            Err(error) => {
                let outcome = self.classify_failure(&error, tenant, !statsbeat);
                match outcome {
                    SendOutcome::RetryWillSpool if statsbeat => SendOutcome::FailureDropped,
                    SendOutcome::RetryWillSpool => {
                        self.spool_for_retry(&payload, tenant, !statsbeat)
                    }
                    other => other,
                }
            }
        }
    }

    async fn resend_spooled(&self, file: &PersistedFile) -> SendOutcome {
        let start = Instant::now();
        match self.attempt(&file.payload, &file.tenant).await {
            Ok(delivered) => {
                self.record_delivery(&delivered, &file.tenant, file.payload.len() as u64, start);
                SendOutcome::Success
            }
            Err(error) => self.classify_failure(&error, &file.tenant, true),
        }
    }

    /// One full attempt: redirect-following, auth-retrying POST loop
    async fn attempt(&self, payload: &Bytes, tenant: &TenantKey) -> Result<Delivered, ChannelError> {
        let mut base = self
            .redirects
            .lookup(tenant)
            .unwrap_or_else(|| self.config.endpoint.clone());
        let mut auth_retried = false;
        let mut redirects = 0usize;

        loop {
            let response = self.post(&base, payload).await?;
            let status = response.status().as_u16();

            match status {
                200 => return Ok(Delivered::Full),
                206 => return Ok(Delivered::Partial),
                307 | 308 => {
                    let location = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    let Some(location) = location else {
                        // Unfollowable redirect; treat as a transient
                        return Err(ChannelError::ServerTransient {
                            status,
                            retry_after: None,
                        });
                    };
                    let target = match Url::parse(&location) {
                        Ok(url) => url,
                        Err(url::ParseError::RelativeUrlWithoutBase) => {
                            base.join(&location).map_err(|_| ChannelError::ServerTransient {
                                status,
                                retry_after: None,
                            })?
                        }
                        Err(_) => {
                            return Err(ChannelError::ServerTransient {
                                status,
                                retry_after: None,
                            })
                        }
                    };

                    redirects += 1;
                    if redirects > MAX_REDIRECTS {
                        return Err(ChannelError::RedirectExhausted { location });
                    }

                    self.redirects
                        .store(tenant, target.clone(), self.config.redirect_ttl);
                    tracing::debug!(tenant = %tenant, target = %target, "ingestion redirect cached");
                    base = target;
                }
                401 | 403 => {
                    if let Some(auth) = &self.auth {
                        if !auth_retried {
                            auth.invalidate();
                            auth_retried = true;
                            continue;
                        }
                    }
                    return Err(ChannelError::AuthRejected(status));
                }
                408 | 429 | 500 | 502 | 503 | 504 => {
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);
                    return Err(ChannelError::ServerTransient { status, retry_after });
                }
                _ => return Err(ChannelError::ClientRejected(status)),
            }
        }
    }

    async fn post(&self, base: &Url, payload: &Bytes) -> Result<reqwest::Response, ChannelError> {
        let url = base
            .join(TRACK_PATH)
            .map_err(|e| ChannelError::Config(format!("unusable ingestion URL {base}: {e}")))?;

        let mut request = self
            .client
            .post(url)
            .query(&[("api-version", self.config.api_version.as_str())])
            .header(CONTENT_TYPE, "application/x-json-stream")
            .header(CONTENT_ENCODING, "gzip")
            .body(payload.clone());

        if let Some(auth) = &self.auth {
            let token = auth.bearer().await.map_err(|e| {
                ChannelError::TransientNetwork(format!("token acquisition failed: {e}"))
            })?;
            request = request.bearer_auth(&token.value);
        }

        request
            .send()
            .await
            .map_err(|e| ChannelError::TransientNetwork(e.to_string()))
    }

    fn record_delivery(&self, delivered: &Delivered, tenant: &TenantKey, bytes: u64, start: Instant) {
        let duration_ms = start.elapsed().as_millis() as u64;
        match delivered {
            Delivered::Full => {
                self.stats.record_success(tenant, bytes, duration_ms);
            }
            Delivered::Partial => {
                tracing::warn!(tenant = %tenant, "ingestion accepted batch partially");
                self.stats.record_partial_success(tenant, bytes, duration_ms);
            }
        }
    }

    /// Map an error to an outcome, updating counters and the retry hint
    fn classify_failure(
        &self,
        error: &ChannelError,
        tenant: &TenantKey,
        record: bool,
    ) -> SendOutcome {
        self.logger.error(error.kind(), error);
        match error {
            ChannelError::ServerTransient { status, retry_after } => {
                if let Some(delay) = retry_after {
                    self.retry_hint.defer(*delay);
                }
                if record {
                    if *status == 429 {
                        self.stats.record_throttle(tenant);
                    } else {
                        self.stats.record_retry(tenant);
                    }
                }
                SendOutcome::RetryWillSpool
            }
            ChannelError::TransientNetwork(_) => {
                if record {
                    self.stats.record_exception(tenant);
                }
                SendOutcome::RetryWillSpool
            }
            ChannelError::RedirectExhausted { .. } => {
                if record {
                    self.stats.record_retry(tenant);
                }
                SendOutcome::RetryWillSpool
            }
            _ => {
                if record {
                    self.stats.record_failure(tenant);
                }
                SendOutcome::FailureDropped
            }
        }
    }

    fn abort_for_shutdown(
        &self,
        payload: &Bytes,
        tenant: &TenantKey,
        statsbeat: bool,
    ) -> SendOutcome {
        if statsbeat {
            return SendOutcome::FailureDropped;
        }
        self.logger.error("shutdown_abort", &ChannelError::ShutdownAbort);
        self.spool_for_retry(payload, tenant, true)
    }

    fn spool_for_retry(&self, payload: &[u8], tenant: &TenantKey, record: bool) -> SendOutcome {
        match self.writer.write_to_disk(payload, tenant) {
            Ok(_) => SendOutcome::RetryWillSpool,
            Err(e) => {
                if record {
                    self.stats.record_retry_drop(tenant);
                }
                self.logger.error("spool_failed", &ChannelError::SpoolFailed(e));
                SendOutcome::FailureDropped
            }
        }
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod channel_test;
