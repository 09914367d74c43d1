use async_trait::async_trait;
use relay_auth::{AuthError, Token, TokenRequest};
use relay_config::AuthMethod;
use tempfile::TempDir;

use super::*;

const TENANT: &str = "00000000-0000-0000-0000-0FEEDDADBEEF";

struct NoopFetcher;

#[async_trait]
impl TokenFetcher for NoopFetcher {
    async fn fetch(&self, _request: &TokenRequest) -> Result<Token, AuthError> {
        Ok(Token::new("noop"))
    }
}

fn test_config(dir: &TempDir) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.spool.directory = dir.path().to_path_buf();
    config.statsbeat.enabled = false;
    config.quickpulse.enabled = false;
    config
}

#[test]
fn test_prepare_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.spool.retention_cap_bytes = 0;
    assert!(matches!(
        Agent::prepare(config, None),
        Err(AgentError::Config(_))
    ));
}

#[test]
fn test_prepare_requires_fetcher_when_auth_enabled() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.auth.enabled = true;
    config.auth.method = Some(AuthMethod::External);
    assert!(matches!(
        Agent::prepare(config, None),
        Err(AgentError::MissingTokenFetcher)
    ));
}

#[test]
fn test_prepare_accepts_fetcher_when_auth_enabled() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.auth.enabled = true;
    config.auth.method = Some(AuthMethod::External);
    Agent::prepare(config, Some(Arc::new(NoopFetcher))).unwrap();
}

#[tokio::test]
async fn test_start_proceeds_when_barrier_dropped() {
    let dir = TempDir::new().unwrap();
    let prepared = Agent::prepare(test_config(&dir), None).unwrap();

    let (barrier_tx, barrier_rx) = oneshot::channel();
    drop(barrier_tx);

    let handle = prepared.start(Some(barrier_rx)).await.unwrap();
    assert_eq!(handle.worker_names(), vec!["drain"]);
    assert!(handle.flush_and_shutdown().await);
}

#[tokio::test]
async fn test_start_waits_for_barrier_signal() {
    let dir = TempDir::new().unwrap();
    let prepared = Agent::prepare(test_config(&dir), None).unwrap();

    let (barrier_tx, barrier_rx) = oneshot::channel();
    barrier_tx.send(()).unwrap();

    let handle = prepared.start(Some(barrier_rx)).await.unwrap();
    assert!(handle.flush_and_shutdown().await);
}

#[tokio::test]
async fn test_workers_reflect_configuration() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.statsbeat.enabled = true;
    config.quickpulse.enabled = true;
    config.quickpulse.instrumentation_key = Some(TENANT.to_owned());

    let handle = Agent::prepare(config, None)
        .unwrap()
        .start(None)
        .await
        .unwrap();
    assert_eq!(handle.worker_names(), vec!["drain", "statsbeat", "quickpulse"]);
    handle.flush_and_shutdown().await;
}

#[tokio::test]
async fn test_quickpulse_skipped_without_instrumentation_key() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.quickpulse.enabled = true;
    config.quickpulse.instrumentation_key = None;

    let handle = Agent::prepare(config, None)
        .unwrap()
        .start(None)
        .await
        .unwrap();
    assert_eq!(handle.worker_names(), vec!["drain"]);
    handle.flush_and_shutdown().await;
}

#[tokio::test]
async fn test_double_shutdown_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let handle = Agent::prepare(test_config(&dir), None)
        .unwrap()
        .start(None)
        .await
        .unwrap();

    assert!(handle.flush_and_shutdown().await);
    assert!(handle.flush_and_shutdown().await);
    assert!(handle.worker_names().is_empty());
}
