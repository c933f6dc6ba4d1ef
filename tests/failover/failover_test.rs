use failover_harness::BackoffPolicy;
use failover_harness::ProcessLauncher;
use failover_harness::ScenarioDriver;
use failover_harness::ScenarioMode;
use failover_harness::StorageClient;
use tracing::info;
use tracing_test::traced_test;

use crate::common::prepare_cluster;
use crate::common::StorageServer;

/// Kill the leader of a 3-instance cluster 3 times, verifying each
/// replacement directly on its own endpoint.
#[tokio::test]
#[traced_test]
async fn test_direct_failover_run() {
    let storage = StorageServer::default();
    let port = storage.spawn();
    let mut test_cluster = prepare_cluster(3, port);
    test_cluster.config.scenario.switch_over_count = 3;
    let config = &test_cluster.config;

    let driver = ScenarioDriver::from_config(config, ProcessLauncher::new(config.launcher.clone())).unwrap();
    let report = driver.run().await.unwrap();
    info!("report: {}", report);

    assert_eq!(report.switch_overs, 3);
    assert_eq!(report.leaders.len(), 4);
    assert!(report.terms().windows(2).all(|w| w[1] > w[0]));
    assert_eq!(report.leaders[0].index, 1);
    assert_eq!(report.leaders[0].endpoint, format!("http://127.0.0.1:{port}"));
    assert_eq!(storage.values.lock().get("123").map(String::as_str), Some("456"));
}

/// Same script with every HTTP call going through one gateway URL and
/// duration-based waits only; afterwards the stored value is checked the way
/// `--verify-only` does.
#[tokio::test]
async fn test_gateway_failover_run_then_verify_persisted() {
    let storage = StorageServer::default();
    let gateway_port = storage.spawn();
    let gateway_url = format!("http://127.0.0.1:{gateway_port}");

    let mut test_cluster = prepare_cluster(3, 1);
    test_cluster.config.scenario.mode = ScenarioMode::Gateway;
    test_cluster.config.scenario.gateway_url = Some(gateway_url.clone());
    test_cluster.config.scenario.switch_over_count = 2;
    test_cluster.config.validate().unwrap();
    let config = &test_cluster.config;

    let report = ScenarioDriver::from_config(config, ProcessLauncher::new(config.launcher.clone()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.switch_overs, 2);
    assert_eq!(report.terms().len(), 3);

    let client = StorageClient::new(&config.http, BackoffPolicy::default()).unwrap();
    client.check_liveness(&gateway_url).await.unwrap();
    client.authenticate(&gateway_url, "1", "").await.unwrap();
    client.verify_persisted(&gateway_url, "123", "456").await.unwrap();
}
