use std::time::Duration;

use failover_harness::ClusterManager;
use failover_harness::InstanceSnapshot;
use failover_harness::ProcessLauncher;
use failover_harness::TimingController;
use tracing_test::traced_test;

use crate::common::prepare_cluster;
use crate::common::process_running;
use crate::common::wait_until;

const ELECTION_WAIT: Duration = Duration::from_secs(10);

fn leader_of(snapshots: &[InstanceSnapshot]) -> Option<(u32, u64)> {
    failover_harness::find_leader(snapshots)
        .unwrap()
        .and_then(|l| l.leader_of_term.map(|term| (l.index, term)))
}

/// Start 3 script servers, kill the leader, and watch the next election
/// through the logs alone.
#[tokio::test]
#[traced_test]
async fn test_3_instance_start_kill_leader_stop() {
    let test_cluster = prepare_cluster(3, 18544);
    let config = &test_cluster.config;
    let timing = TimingController::new(config.timing.clone());
    let mut manager = ClusterManager::new(config.cluster.clone(), ProcessLauncher::new(config.launcher.clone()));

    manager.create_instances(3).unwrap();
    timing.await_all_ready(manager.instances()).await.unwrap();
    for handle in manager.instances() {
        assert_eq!(handle.endpoint(), "http://127.0.0.1:18544");
        assert!(handle.pid().is_some());
    }

    assert!(wait_until(ELECTION_WAIT, || leader_of(&manager.snapshot()).is_some()).await);
    let (first_index, first_term) = leader_of(&manager.snapshot()).unwrap();
    assert_eq!((first_index, first_term), (1, 1));

    assert!(manager.stop(first_index));
    assert!(!manager.stop(first_index));
    assert!(wait_until(ELECTION_WAIT, || leader_of(&manager.snapshot()).is_some()).await);
    let (second_index, second_term) = leader_of(&manager.snapshot()).unwrap();
    assert_eq!(second_index, 2);
    assert!(second_term > first_term);

    // Restarted slot rejoins as a follower.
    let fresh = manager.restart(first_index).unwrap();
    let old = manager.replace(fresh).unwrap();
    assert!(old.is_killed());
    timing
        .await_ready_within(manager.get(first_index).unwrap(), Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(manager.get(first_index).unwrap().leader_of_term(), None);
    assert_eq!(manager.find_leaders().unwrap().len(), 1);

    assert_eq!(manager.stop_all(), 3);
    assert!(wait_until(ELECTION_WAIT, || manager.instances().iter().all(|h| h.exit_code().is_some())).await);

    let log = std::fs::read_to_string(test_cluster.instance_dir(2).join("logs/console.log")).unwrap();
    assert!(log.contains("worker count 1, cluster YES"));
    assert!(log.contains(&format!("became leader of term {second_term}")));
}

#[tokio::test]
async fn dropping_the_manager_kills_instances() {
    let test_cluster = prepare_cluster(2, 18545);
    let config = &test_cluster.config;
    let timing = TimingController::new(config.timing.clone());
    let mut manager = ClusterManager::new(config.cluster.clone(), ProcessLauncher::new(config.launcher.clone()));

    manager.create_instances(2).unwrap();
    timing.await_all_ready(manager.instances()).await.unwrap();
    let pids: Vec<u32> = manager.instances().iter().filter_map(|h| h.pid()).collect();
    assert_eq!(pids.len(), 2);
    drop(manager);

    let gone = wait_until(ELECTION_WAIT, || pids.iter().all(|pid| !process_running(*pid))).await;
    assert!(gone);
}
