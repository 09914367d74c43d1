use super::*;

const TENANT_A: &str = "00000000-0000-0000-0000-0FEEDDADBEEF";
const TENANT_B: &str = "C6864988-6BF8-45EF-8590-1FD3D84E5A4D";

fn tenant(s: &str) -> TenantKey {
    TenantKey::parse(s).unwrap()
}

#[test]
fn test_success_records_bytes_and_duration() {
    let stats = NetworkStatsbeat::new();
    let t = tenant(TENANT_A);

    stats.record_success(&t, 100, 25);
    stats.record_success(&t, 50, 5);

    let snapshot = stats.peek(&t);
    assert_eq!(snapshot.request_success, 2);
    assert_eq!(snapshot.bytes_sent, 150);
    assert_eq!(snapshot.duration_total_ms, 30);
}

#[test]
fn test_partial_success_counts_both() {
    let stats = NetworkStatsbeat::new();
    let t = tenant(TENANT_A);

    stats.record_partial_success(&t, 10, 1);

    let snapshot = stats.peek(&t);
    assert_eq!(snapshot.request_success, 1);
    assert_eq!(snapshot.partial_success, 1);
}

#[test]
fn test_tenants_are_isolated() {
    let stats = NetworkStatsbeat::new();
    let a = tenant(TENANT_A);
    let b = tenant(TENANT_B);

    stats.record_retry(&a);
    stats.record_throttle(&b);

    assert_eq!(stats.peek(&a).retry_count, 1);
    assert_eq!(stats.peek(&a).throttle_count, 0);
    assert_eq!(stats.peek(&b).throttle_count, 1);
}

#[test]
fn test_snapshot_resets_counters() {
    let stats = NetworkStatsbeat::new();
    let t = tenant(TENANT_A);

    stats.record_success(&t, 100, 10);
    stats.record_failure(&t);
    stats.record_exception(&t);
    stats.record_retry_drop(&t);

    let windows = stats.snapshot_and_reset();
    assert_eq!(windows.len(), 1);
    let (key, snapshot) = &windows[0];
    assert_eq!(key, &t);
    assert_eq!(snapshot.request_success, 1);
    assert_eq!(snapshot.request_failure, 1);
    assert_eq!(snapshot.exception_count, 1);
    assert_eq!(snapshot.retry_drop, 1);

    // Window reset: everything reads zero now
    assert!(stats.peek(&t).is_empty());
    assert!(stats.snapshot_and_reset().is_empty());
}

#[test]
fn test_empty_windows_not_reported() {
    let stats = NetworkStatsbeat::new();
    let t = tenant(TENANT_A);

    stats.record_success(&t, 1, 1);
    let _ = stats.snapshot_and_reset();

    // Tenant entry still exists but has nothing to report
    assert!(stats.snapshot_and_reset().is_empty());
}
