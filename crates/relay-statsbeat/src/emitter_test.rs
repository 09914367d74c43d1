use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use flate2::read::GzDecoder;

use super::*;

const TENANT: &str = "00000000-0000-0000-0000-0FEEDDADBEEF";

struct RecordingSubmitter {
    accept: bool,
    batches: Mutex<Vec<(TenantKey, Bytes)>>,
}

impl RecordingSubmitter {
    fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept,
            batches: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl StatsbeatSubmitter for RecordingSubmitter {
    async fn submit(&self, tenant: &TenantKey, body: Bytes) -> bool {
        self.batches.lock().unwrap().push((tenant.clone(), body));
        self.accept
    }
}

fn gunzip_lines(body: &Bytes) -> Vec<serde_json::Value> {
    let mut decoder = GzDecoder::new(body.as_ref());
    let mut text = String::new();
    decoder.read_to_string(&mut text).unwrap();
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_batch_shape() {
    let tenant = TenantKey::parse(TENANT).unwrap();
    let snapshot = TenantSnapshot {
        request_success: 2,
        retry_count: 1,
        bytes_sent: 300,
        duration_total_ms: 50,
        ..Default::default()
    };

    let body = encode_batch(&tenant, &snapshot).unwrap();
    let lines = gunzip_lines(&body);

    // success, retry, bytes, duration
    assert_eq!(lines.len(), 4);
    for line in &lines {
        assert_eq!(line["name"], "Statsbeat");
        assert_eq!(line["iKey"], TENANT);
        assert_eq!(line["data"]["baseType"], "MetricData");
        let props = &line["data"]["baseData"]["properties"];
        assert_eq!(props["cikey"], TENANT);
        assert_eq!(props["language"], "rust");
        assert_eq!(props["attach"], "codeless");
    }

    let duration = lines
        .iter()
        .find(|l| l["data"]["baseData"]["metrics"][0]["name"] == "Request Duration")
        .unwrap();
    let point = &duration["data"]["baseData"]["metrics"][0];
    assert_eq!(point["value"], 25.0);
    assert_eq!(point["count"], 2);
}

#[test]
fn test_zero_metrics_omitted() {
    let tenant = TenantKey::parse(TENANT).unwrap();
    let snapshot = TenantSnapshot {
        throttle_count: 3,
        ..Default::default()
    };

    let lines = gunzip_lines(&encode_batch(&tenant, &snapshot).unwrap());
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0]["data"]["baseData"]["metrics"][0]["name"],
        "Throttle Count"
    );
    assert_eq!(lines[0]["data"]["baseData"]["metrics"][0]["value"], 3.0);
}

#[tokio::test]
async fn test_shutdown_flushes_final_window() {
    let stats = Arc::new(NetworkStatsbeat::new());
    let tenant = TenantKey::parse(TENANT).unwrap();
    stats.record_success(&tenant, 10, 1);

    let submitter = RecordingSubmitter::new(true);
    let emitter = StatsbeatEmitter::new(
        Arc::clone(&stats),
        submitter.clone() as Arc<dyn StatsbeatSubmitter>,
        Duration::from_secs(3600),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = tokio::spawn(emitter.run(shutdown_rx));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    let batches = submitter.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, tenant);

    // Counters were reset by the snapshot
    assert!(stats.peek(&tenant).is_empty());
}

#[tokio::test]
async fn test_rejected_batch_is_dropped_not_retried() {
    let stats = Arc::new(NetworkStatsbeat::new());
    let tenant = TenantKey::parse(TENANT).unwrap();
    stats.record_failure(&tenant);

    let submitter = RecordingSubmitter::new(false);
    let emitter = StatsbeatEmitter::new(
        Arc::clone(&stats),
        submitter.clone() as Arc<dyn StatsbeatSubmitter>,
        Duration::from_secs(3600),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = tokio::spawn(emitter.run(shutdown_rx));
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    // Submitted once, then gone: next window starts empty
    assert_eq!(submitter.batches.lock().unwrap().len(), 1);
    assert!(stats.snapshot_and_reset().is_empty());
}
