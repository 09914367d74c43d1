//! Per-tenant outcome counters
//!
//! All counters are atomic adds on the hot path; the emitter swaps them to
//! zero when it snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use relay_protocol::TenantKey;

/// Counters for one tenant within one statsbeat window
#[derive(Debug, Default)]
pub struct TenantCounters {
    /// Requests that returned 200
    pub request_success: AtomicU64,

    /// Requests dropped as permanent failures
    pub request_failure: AtomicU64,

    /// Requests that were retried (spooled)
    pub retry_count: AtomicU64,

    /// Requests throttled with 429
    pub throttle_count: AtomicU64,

    /// Network-level exceptions (timeout, refused, reset)
    pub exception_count: AtomicU64,

    /// Payload bytes delivered successfully
    pub bytes_sent: AtomicU64,

    /// Sum of request durations in milliseconds
    pub duration_total_ms: AtomicU64,

    /// Partial (206) acceptances, counted alongside success
    pub partial_success: AtomicU64,

    /// Payloads dropped because spooling the retry failed
    pub retry_drop: AtomicU64,
}

impl TenantCounters {
    fn swap_to_snapshot(&self) -> TenantSnapshot {
        TenantSnapshot {
            request_success: self.request_success.swap(0, Ordering::Relaxed),
            request_failure: self.request_failure.swap(0, Ordering::Relaxed),
            retry_count: self.retry_count.swap(0, Ordering::Relaxed),
            throttle_count: self.throttle_count.swap(0, Ordering::Relaxed),
            exception_count: self.exception_count.swap(0, Ordering::Relaxed),
            bytes_sent: self.bytes_sent.swap(0, Ordering::Relaxed),
            duration_total_ms: self.duration_total_ms.swap(0, Ordering::Relaxed),
            partial_success: self.partial_success.swap(0, Ordering::Relaxed),
            retry_drop: self.retry_drop.swap(0, Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of one tenant's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantSnapshot {
    pub request_success: u64,
    pub request_failure: u64,
    pub retry_count: u64,
    pub throttle_count: u64,
    pub exception_count: u64,
    pub bytes_sent: u64,
    pub duration_total_ms: u64,
    pub partial_success: u64,
    pub retry_drop: u64,
}

impl TenantSnapshot {
    /// Whether anything happened this window
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Delivery counters keyed by tenant
#[derive(Debug, Default)]
pub struct NetworkStatsbeat {
    tenants: DashMap<TenantKey, TenantCounters>,
}

impl NetworkStatsbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful delivery
    pub fn record_success(&self, tenant: &TenantKey, bytes: u64, duration_ms: u64) {
        let entry = self.entry(tenant);
        entry.request_success.fetch_add(1, Ordering::Relaxed);
        entry.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        entry
            .duration_total_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// Record a 206 partial acceptance (also counts as success)
    pub fn record_partial_success(&self, tenant: &TenantKey, bytes: u64, duration_ms: u64) {
        self.record_success(tenant, bytes, duration_ms);
        self.entry(tenant)
            .partial_success
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a permanent drop
    pub fn record_failure(&self, tenant: &TenantKey) {
        self.entry(tenant)
            .request_failure
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry (payload spooled)
    pub fn record_retry(&self, tenant: &TenantKey) {
        self.entry(tenant).retry_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a 429 throttle
    pub fn record_throttle(&self, tenant: &TenantKey) {
        self.entry(tenant)
            .throttle_count
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a network-level exception
    pub fn record_exception(&self, tenant: &TenantKey) {
        self.entry(tenant)
            .exception_count
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a payload dropped because the retry could not be spooled
    pub fn record_retry_drop(&self, tenant: &TenantKey) {
        self.entry(tenant).retry_drop.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot every tenant's counters and reset them to zero
    pub fn snapshot_and_reset(&self) -> Vec<(TenantKey, TenantSnapshot)> {
        let mut out = Vec::new();
        for entry in self.tenants.iter() {
            let snapshot = entry.value().swap_to_snapshot();
            if !snapshot.is_empty() {
                out.push((entry.key().clone(), snapshot));
            }
        }
        out
    }

    /// Read one tenant's counters without resetting (tests, diagnostics)
    pub fn peek(&self, tenant: &TenantKey) -> TenantSnapshot {
        self.tenants
            .get(tenant)
            .map(|entry| TenantSnapshot {
                request_success: entry.request_success.load(Ordering::Relaxed),
                request_failure: entry.request_failure.load(Ordering::Relaxed),
                retry_count: entry.retry_count.load(Ordering::Relaxed),
                throttle_count: entry.throttle_count.load(Ordering::Relaxed),
                exception_count: entry.exception_count.load(Ordering::Relaxed),
                bytes_sent: entry.bytes_sent.load(Ordering::Relaxed),
                duration_total_ms: entry.duration_total_ms.load(Ordering::Relaxed),
                partial_success: entry.partial_success.load(Ordering::Relaxed),
                retry_drop: entry.retry_drop.load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }

    fn entry(&self, tenant: &TenantKey) -> dashmap::mapref::one::Ref<'_, TenantKey, TenantCounters> {
        if let Some(entry) = self.tenants.get(tenant) {
            return entry;
        }
        self.tenants
            .entry(tenant.clone())
            .or_default()
            .downgrade()
    }
}

#[cfg(test)]
#[path = "counters_test.rs"]
mod counters_test;
