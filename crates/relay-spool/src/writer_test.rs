use std::sync::Arc;

use tempfile::tempdir;

use super::*;
use crate::index::DEFAULT_RETENTION_CAP_BYTES;

const TENANT: &str = "00000000-0000-0000-0000-0FEEDDADBEEF";

fn tenant() -> TenantKey {
    TenantKey::parse(TENANT).unwrap()
}

#[test]
fn test_write_publishes_trn_file() {
    let dir = tempdir().unwrap();
    let index = Arc::new(SpoolIndex::new(dir.path(), DEFAULT_RETENTION_CAP_BYTES).unwrap());
    let writer = SpoolWriter::new(Arc::clone(&index));

    let filename = writer.write_to_disk(b"hello world", &tenant()).unwrap();

    assert!(filename.ends_with(".trn"));
    assert!(dir.path().join(&filename).exists());
    assert_eq!(index.len(), 1);

    // No .tmp left behind
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_written_record_decodes() {
    let dir = tempdir().unwrap();
    let index = Arc::new(SpoolIndex::new(dir.path(), DEFAULT_RETENTION_CAP_BYTES).unwrap());
    let writer = SpoolWriter::new(Arc::clone(&index));

    let before = now_ms();
    let filename = writer.write_to_disk(b"payload bytes", &tenant()).unwrap();
    let after = now_ms();

    let bytes = fs::read(dir.path().join(&filename)).unwrap();
    let envelope = relay_protocol::decode(&bytes).unwrap();
    assert_eq!(envelope.tenant.as_str(), TENANT);
    assert_eq!(&envelope.payload[..], b"payload bytes");
    assert!(envelope.created_at_ms >= before && envelope.created_at_ms <= after);
}

#[test]
fn test_each_write_gets_unique_filename() {
    let dir = tempdir().unwrap();
    let index = Arc::new(SpoolIndex::new(dir.path(), DEFAULT_RETENTION_CAP_BYTES).unwrap());
    let writer = SpoolWriter::new(index);

    let a = writer.write_to_disk(b"a", &tenant()).unwrap();
    let b = writer.write_to_disk(b"b", &tenant()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_write_failure_cleans_up_tmp() {
    let dir = tempdir().unwrap();
    let index = Arc::new(SpoolIndex::new(dir.path(), DEFAULT_RETENTION_CAP_BYTES).unwrap());
    let writer = SpoolWriter::new(Arc::clone(&index));

    // Remove the spool directory out from under the writer
    fs::remove_dir_all(dir.path()).unwrap();

    let result = writer.write_to_disk(b"doomed", &tenant());
    assert!(result.is_err());
    assert_eq!(index.len(), 0);
    assert_eq!(index.metrics().snapshot().write_errors, 1);
}

#[test]
fn test_metrics_count_bytes_with_header() {
    let dir = tempdir().unwrap();
    let index = Arc::new(SpoolIndex::new(dir.path(), DEFAULT_RETENTION_CAP_BYTES).unwrap());
    let writer = SpoolWriter::new(Arc::clone(&index));

    writer.write_to_disk(b"12345", &tenant()).unwrap();

    let snapshot = index.metrics().snapshot();
    assert_eq!(snapshot.files_written, 1);
    assert_eq!(
        snapshot.bytes_written,
        (relay_protocol::HEADER_LEN + 5) as u64
    );
}
