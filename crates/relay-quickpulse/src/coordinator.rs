//! QuickPulse coordinator - the ping/post state machine
//!
//! Pings `{endpoint}/ping` until the service answers with
//! `x-ms-qps-subscribed: true`, then posts the current counter window to
//! `{endpoint}/post` on the fast cadence. Three consecutive unsubscribed
//! posts, any 5xx, or a network error drop the coordinator back to pinging
//! after the error backoff.
//!
//! Responses may carry `x-ms-qps-service-endpoint-redirect` (a sticky,
//! session-only endpoint override) and
//! `x-ms-qps-service-polling-interval-hint` (milliseconds), both honored
//! immediately.

use std::sync::Arc;
use std::time::Duration;

use relay_protocol::TenantKey;
use relay_statsbeat::NetworkStatsbeat;
use reqwest::header::HeaderMap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::error::QuickPulseError;
use crate::metrics::QuickPulseMetrics;

/// Default wait between pings
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(5000);

/// Default wait between posts while subscribed
pub const DEFAULT_POST_INTERVAL: Duration = Duration::from_millis(1000);

/// Default pause after an error or loss of subscription
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_millis(60_000);

/// Unsubscribed posts tolerated before falling back to pinging
pub const MAX_CONSECUTIVE_UNSUBSCRIBED: u32 = 3;

const SUBSCRIBED_HEADER: &str = "x-ms-qps-subscribed";
const REDIRECT_HEADER: &str = "x-ms-qps-service-endpoint-redirect";
const INTERVAL_HINT_HEADER: &str = "x-ms-qps-service-polling-interval-hint";

/// Coordinator configuration, validated eagerly at construction
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Live-metrics base URL
    pub endpoint: Url,

    /// Tenant whose counters are reported
    pub tenant: TenantKey,

    pub ping_interval: Duration,
    pub post_interval: Duration,
    pub error_backoff: Duration,

    /// Hard per-request timeout
    pub request_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn new(endpoint: Url, tenant: TenantKey) -> Self {
        Self {
            endpoint,
            tenant,
            ping_interval: DEFAULT_PING_INTERVAL,
            post_interval: DEFAULT_POST_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            request_timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    #[must_use]
    pub fn with_post_interval(mut self, interval: Duration) -> Self {
        self.post_interval = interval;
        self
    }

    #[must_use]
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    fn validate(&self) -> Result<(), QuickPulseError> {
        if self.ping_interval.is_zero()
            || self.post_interval.is_zero()
            || self.error_backoff.is_zero()
        {
            return Err(QuickPulseError::InvalidConfig(
                "intervals must be non-zero".into(),
            ));
        }
        if !matches!(self.endpoint.scheme(), "http" | "https") {
            return Err(QuickPulseError::InvalidConfig(format!(
                "unsupported endpoint scheme {}",
                self.endpoint.scheme()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pinging,
    Posting,
}

/// The live-metrics worker
pub struct QuickPulseCoordinator {
    config: CoordinatorConfig,
    client: reqwest::Client,
    stats: Arc<NetworkStatsbeat>,
    metrics: Arc<QuickPulseMetrics>,
}

impl QuickPulseCoordinator {
    /// Build a coordinator; fails fast on a bad configuration
    pub fn new(
        config: CoordinatorConfig,
        stats: Arc<NetworkStatsbeat>,
    ) -> Result<Self, QuickPulseError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| QuickPulseError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            stats,
            metrics: Arc::new(QuickPulseMetrics::new()),
        })
    }

    /// Shared activity counters
    pub fn metrics(&self) -> Arc<QuickPulseMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until the shutdown signal fires
    ///
    /// QuickPulse is cancelled immediately at shutdown; there is no flush.
    pub async fn run(self, mut shutdown: watch::Receiver<()>) {
        let mut state = State::Pinging;
        let mut endpoint = self.config.endpoint.clone();
        let mut interval_hint: Option<Duration> = None;
        let mut unsubscribed_streak = 0u32;

        loop {
            let delay = interval_hint.unwrap_or(match state {
                State::Pinging => self.config.ping_interval,
                State::Posting => self.config.post_interval,
            });

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    debug!("quickpulse coordinator stopped");
                    return;
                }
            }

            match state {
                State::Pinging => match self.ping(&mut endpoint, &mut interval_hint).await {
                    Ok(true) => {
                        debug!("live metrics subscribed, switching to posting");
                        state = State::Posting;
                        unsubscribed_streak = 0;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        self.metrics.record_error();
                        warn!(error = %e, "quickpulse ping failed");
                        if !sleep_or_shutdown(self.config.error_backoff, &mut shutdown).await {
                            return;
                        }
                    }
                },
                State::Posting => match self.post(&mut endpoint, &mut interval_hint).await {
                    Ok(true) => unsubscribed_streak = 0,
                    Ok(false) => {
                        unsubscribed_streak += 1;
                        if unsubscribed_streak >= MAX_CONSECUTIVE_UNSUBSCRIBED {
                            debug!("live metrics unsubscribed, falling back to pinging");
                            state = State::Pinging;
                            unsubscribed_streak = 0;
                            if !sleep_or_shutdown(self.config.error_backoff, &mut shutdown).await {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        self.metrics.record_error();
                        warn!(error = %e, "quickpulse post failed, falling back to pinging");
                        state = State::Pinging;
                        unsubscribed_streak = 0;
                        if !sleep_or_shutdown(self.config.error_backoff, &mut shutdown).await {
                            return;
                        }
                    }
                },
            }
        }
    }

    /// One ping; returns whether the service subscribed
    async fn ping(
        &self,
        endpoint: &mut Url,
        interval_hint: &mut Option<Duration>,
    ) -> Result<bool, QuickPulseError> {
        self.metrics.record_ping();
        let headers = self.request(endpoint, "ping", None).await?;
        self.apply_headers(&headers, endpoint, interval_hint);
        Ok(parse_subscribed(&headers))
    }

    /// One counter post; returns whether the service is still subscribed
    async fn post(
        &self,
        endpoint: &mut Url,
        interval_hint: &mut Option<Duration>,
    ) -> Result<bool, QuickPulseError> {
        self.metrics.record_post();
        let body = self.counter_document();
        let headers = self.request(endpoint, "post", Some(body)).await?;
        self.apply_headers(&headers, endpoint, interval_hint);
        Ok(parse_subscribed(&headers))
    }

    async fn request(
        &self,
        endpoint: &Url,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HeaderMap, QuickPulseError> {
        let url = endpoint
            .join(path)
            .map_err(|e| QuickPulseError::InvalidConfig(format!("unusable endpoint: {e}")))?;

        let mut request = self
            .client
            .post(url)
            .query(&[("ikey", self.config.tenant.as_str())]);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QuickPulseError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuickPulseError::ServerStatus(status.as_u16()));
        }
        Ok(response.headers().clone())
    }

    fn apply_headers(
        &self,
        headers: &HeaderMap,
        endpoint: &mut Url,
        interval_hint: &mut Option<Duration>,
    ) {
        if let Some(redirect) = parse_redirect(headers) {
            if redirect != *endpoint {
                debug!(target = %redirect, "live metrics endpoint redirected for this session");
                self.metrics.record_redirect();
                *endpoint = redirect;
            }
        }
        if let Some(hint) = parse_interval_hint(headers) {
            *interval_hint = Some(hint);
        }
    }

    /// Current counter window for the configured tenant, non-resetting
    fn counter_document(&self) -> Vec<u8> {
        let window = self.stats.peek(&self.config.tenant);
        let doc = CounterDocument {
            instrumentation_key: self.config.tenant.as_str(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            request_success: window.request_success,
            request_failure: window.request_failure,
            retry_count: window.retry_count,
            throttle_count: window.throttle_count,
            exception_count: window.exception_count,
            bytes_sent: window.bytes_sent,
            duration_total_ms: window.duration_total_ms,
        };
        serde_json::to_vec(&doc).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct CounterDocument<'a> {
    #[serde(rename = "iKey")]
    instrumentation_key: &'a str,
    timestamp: String,
    request_success: u64,
    request_failure: u64,
    retry_count: u64,
    throttle_count: u64,
    exception_count: u64,
    bytes_sent: u64,
    duration_total_ms: u64,
}

/// Sleep that aborts early on shutdown; returns false when shutting down
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<()>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown.changed() => {
            debug!("quickpulse coordinator stopped");
            false
        }
    }
}

fn parse_subscribed(headers: &HeaderMap) -> bool {
    headers
        .get(SUBSCRIBED_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_redirect(headers: &HeaderMap) -> Option<Url> {
    let value = headers.get(REDIRECT_HEADER)?.to_str().ok()?;
    Url::parse(value).ok()
}

fn parse_interval_hint(headers: &HeaderMap) -> Option<Duration> {
    let ms = headers
        .get(INTERVAL_HINT_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    (ms > 0).then(|| Duration::from_millis(ms))
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod coordinator_test;
