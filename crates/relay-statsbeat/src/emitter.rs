//! Periodic statsbeat emitter
//!
//! Snapshots the per-tenant counters on a fixed cadence, serializes them as
//! gzipped JSON-lines metric envelopes, and hands each batch to the
//! submitter. The submitter marks the batch as statsbeat so the channel
//! does not record counters about the counter delivery itself.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use relay_protocol::TenantKey;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::counters::{NetworkStatsbeat, TenantSnapshot};

/// Delivery seam for statsbeat batches
///
/// Implemented by the agent wiring, which forwards the batch through the
/// transmission channel with the statsbeat flag set.
#[async_trait]
pub trait StatsbeatSubmitter: Send + Sync {
    /// Submit one gzipped JSON-lines batch for one tenant
    ///
    /// Returns whether the batch was accepted for delivery. Failures are
    /// logged and dropped; a missed window is never retried.
    async fn submit(&self, tenant: &TenantKey, body: Bytes) -> bool;
}

/// Worker that drains the counters into batches
pub struct StatsbeatEmitter {
    stats: Arc<NetworkStatsbeat>,
    submitter: Arc<dyn StatsbeatSubmitter>,
    interval: Duration,
}

impl StatsbeatEmitter {
    pub fn new(
        stats: Arc<NetworkStatsbeat>,
        submitter: Arc<dyn StatsbeatSubmitter>,
        interval: Duration,
    ) -> Self {
        Self {
            stats,
            submitter,
            interval,
        }
    }

    /// Run until the shutdown signal fires
    ///
    /// Emits one final snapshot on shutdown so counters accumulated since
    /// the last tick are not lost.
    pub async fn run(self, mut shutdown: watch::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so the first window is full-length.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.emit_window().await;
                }
                _ = shutdown.changed() => {
                    self.emit_window().await;
                    debug!("statsbeat emitter stopped");
                    return;
                }
            }
        }
    }

    /// Snapshot, serialize, and submit one window per tenant
    async fn emit_window(&self) {
        for (tenant, snapshot) in self.stats.snapshot_and_reset() {
            let body = match encode_batch(&tenant, &snapshot) {
                Ok(body) => body,
                Err(e) => {
                    warn!(tenant = %tenant, error = %e, "failed to encode statsbeat batch");
                    continue;
                }
            };
            if !self.submitter.submit(&tenant, body).await {
                warn!(tenant = %tenant, "statsbeat batch not accepted, window dropped");
            }
        }
    }
}

#[derive(Serialize)]
struct MetricEnvelope<'a> {
    name: &'static str,
    time: &'a str,
    #[serde(rename = "iKey")]
    i_key: &'a str,
    data: EnvelopeData<'a>,
}

#[derive(Serialize)]
struct EnvelopeData<'a> {
    #[serde(rename = "baseType")]
    base_type: &'static str,
    #[serde(rename = "baseData")]
    base_data: MetricData<'a>,
}

#[derive(Serialize)]
struct MetricData<'a> {
    metrics: [MetricPoint; 1],
    properties: Dimensions<'a>,
}

#[derive(Serialize)]
struct MetricPoint {
    name: &'static str,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
}

#[derive(Serialize)]
struct Dimensions<'a> {
    cikey: &'a str,
    language: &'static str,
    attach: &'static str,
}

/// Serialize one tenant's window as gzipped JSON lines, one envelope per
/// non-zero metric
fn encode_batch(tenant: &TenantKey, snapshot: &TenantSnapshot) -> std::io::Result<Bytes> {
    let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut points: Vec<MetricPoint> = Vec::new();
    let mut push = |name: &'static str, value: u64| {
        if value > 0 {
            points.push(MetricPoint {
                name,
                value: value as f64,
                count: None,
            });
        }
    };
    push("Request Success Count", snapshot.request_success);
    push("Request Failure Count", snapshot.request_failure);
    push("Retry Count", snapshot.retry_count);
    push("Throttle Count", snapshot.throttle_count);
    push("Exception Count", snapshot.exception_count);
    push("Bytes Sent", snapshot.bytes_sent);
    push("Partial Success Count", snapshot.partial_success);
    push("Retry Drop Count", snapshot.retry_drop);

    // Duration reported as the window average, with the sample count
    if snapshot.request_success > 0 {
        points.push(MetricPoint {
            name: "Request Duration",
            value: snapshot.duration_total_ms as f64 / snapshot.request_success as f64,
            count: Some(snapshot.request_success),
        });
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for point in points {
        let envelope = MetricEnvelope {
            name: "Statsbeat",
            time: &time,
            i_key: tenant.as_str(),
            data: EnvelopeData {
                base_type: "MetricData",
                base_data: MetricData {
                    metrics: [point],
                    properties: Dimensions {
                        cikey: tenant.as_str(),
                        language: "rust",
                        attach: "codeless",
                    },
                },
            },
        };
        serde_json::to_writer(&mut encoder, &envelope)?;
        encoder.write_all(b"\n")?;
    }
    Ok(Bytes::from(encoder.finish()?))
}

#[cfg(test)]
#[path = "emitter_test.rs"]
mod emitter_test;
