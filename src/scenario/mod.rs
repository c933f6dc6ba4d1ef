//! Failover script: start the cluster, find its leader, prove the leader
//! serves, then repeatedly kill the leader and check its replacement.
//!
//! ```text
//! Bootstrapping -> LeaderKnown -> Verifying -> FailingOver(1..=k) -> TearingDown -> Done
//! ```
//!
//! Any failure jumps straight to `TearingDown`; instances are always stopped
//! before [`ScenarioDriver::run`] returns.


use std::fmt;

use tokio::time::timeout;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::ensure_term_advanced;
use crate::ClusterManager;
use crate::ConsistencyViolation;
use crate::Error;
use crate::HarnessConfig;
use crate::InstanceSnapshot;
use crate::Launcher;
use crate::Result;
use crate::ScenarioConfig;
use crate::ScenarioMode;
use crate::StorageClient;
use crate::TimeoutError;
use crate::TimingController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Bootstrapping,
    LeaderKnown,
    Verifying,
    FailingOver { iteration: usize },
    TearingDown,
    Done,
}

/// A leader observed during the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderRecord {
    pub index: u32,
    pub term: u64,
    pub endpoint: String,
}

impl LeaderRecord {
    fn from_snapshot(snapshot: &InstanceSnapshot) -> Option<Self> {
        Some(Self {
            index: snapshot.index,
            term: snapshot.leader_of_term?,
            endpoint: snapshot.endpoint.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Every leader in the order it was found; the first is the initial one
    pub leaders: Vec<LeaderRecord>,
    pub switch_overs: usize,
}

impl ScenarioReport {
    pub fn terms(&self) -> Vec<u64> {
        self.leaders.iter().map(|l| l.term).collect()
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} switch-overs, leaders:", self.switch_overs)?;
        for leader in &self.leaders {
            write!(f, " [instance {} term {}]", leader.index, leader.term)?;
        }
        Ok(())
    }
}

pub struct ScenarioDriver<L: Launcher> {
    cluster: ClusterManager<L>,
    timing: TimingController,
    client: StorageClient,
    config: ScenarioConfig,
    instance_count: u32,
    state: ScenarioState,
    current_leader: Option<LeaderRecord>,
    report: ScenarioReport,
}

impl<L: Launcher> ScenarioDriver<L> {
    pub fn new(
        cluster: ClusterManager<L>,
        timing: TimingController,
        client: StorageClient,
        config: ScenarioConfig,
        instance_count: u32,
    ) -> Self {
        Self {
            cluster,
            timing,
            client,
            config,
            instance_count,
            state: ScenarioState::Bootstrapping,
            current_leader: None,
            report: ScenarioReport::default(),
        }
    }

    /// Wire a driver from loaded configuration around `launcher`.
    pub fn from_config(
        config: &HarnessConfig,
        launcher: L,
    ) -> Result<Self> {
        let client = StorageClient::new(&config.http, config.retry.http)?;
        Ok(Self::new(
            ClusterManager::new(config.cluster.clone(), launcher),
            TimingController::new(config.timing.clone()),
            client,
            config.scenario.clone(),
            config.cluster.instance_count,
        ))
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn cluster(&self) -> &ClusterManager<L> {
        &self.cluster
    }

    /// Run the whole script, bounded by `run_timeout_secs` when configured.
    ///
    /// Instances are stopped on every exit path.
    ///
    /// # Errors
    /// The first failure of the run. A timeout of the overall allowance
    /// carries the last known state of every instance.
    pub async fn run(mut self) -> Result<ScenarioReport> {
        let outcome = match self.timing.config().run_timeout() {
            Some(limit) => {
                let timed = timeout(limit, self.drive()).await;
                match timed {
                    Ok(outcome) => outcome,
                    Err(_) => Err(TimeoutError {
                        operation: format!("failover run ({:?})", self.state),
                        after: limit,
                        last_known: self.cluster.snapshot(),
                    }
                    .into()),
                }
            }
            None => self.drive().await,
        };

        if let Err(e) = &outcome {
            if e.is_consistency_violation() {
                error!("election invariant broken in {:?}: {}", self.state, e);
            } else if e.is_fatal() {
                error!("run aborted in {:?}: {}", self.state, e);
            } else {
                error!("step failed in {:?}: {}", self.state, e);
            }
        }

        self.tear_down();
        outcome.map(|_| std::mem::take(&mut self.report))
    }

    async fn drive(&mut self) -> Result<()> {
        self.bootstrap().await?;
        self.elect_initial_leader()?;
        self.verify_initial_leader().await?;

        for iteration in 1..=self.config.switch_over_count {
            self.fail_over(iteration).await?;
        }

        info!("run complete: {}", self.report);
        Ok(())
    }

    async fn bootstrap(&mut self) -> Result<()> {
        self.transition(ScenarioState::Bootstrapping);
        self.cluster.create_instances(self.instance_count)?;

        if self.config.mode == ScenarioMode::Direct {
            self.timing.await_all_ready(self.cluster.instances()).await?;
        }
        self.timing.await_cluster_startup().await;
        Ok(())
    }

    fn elect_initial_leader(&mut self) -> Result<()> {
        let leaders = self.cluster.find_leaders()?;
        let leader = match leaders.as_slice() {
            [] => None,
            [only] => LeaderRecord::from_snapshot(only),
            _ => {
                return Err(ConsistencyViolation::UnexpectedLeaderCount { found: leaders.len() }.into());
            }
        };
        let leader = leader.ok_or_else(|| ConsistencyViolation::NoLeader {
            phase: "after startup".into(),
        })?;

        self.record_leader(leader);
        self.transition(ScenarioState::LeaderKnown);
        Ok(())
    }

    async fn verify_initial_leader(&mut self) -> Result<()> {
        self.transition(ScenarioState::Verifying);
        let base = self.base_url()?;

        self.client.check_liveness(&base).await?;
        self.client
            .authenticate(&base, &self.config.username, &self.config.password)
            .await?;
        self.client
            .round_trip(&base, &self.config.key, &self.config.value)
            .await
    }

    async fn fail_over(
        &mut self,
        iteration: usize,
    ) -> Result<()> {
        self.transition(ScenarioState::FailingOver { iteration });
        let previous = self.current_leader.clone().ok_or_else(|| ConsistencyViolation::NoLeader {
            phase: format!("before switch-over {iteration}"),
        })?;

        self.cluster.stop(previous.index);
        self.timing.await_recovery().await;

        let leader = self
            .cluster
            .find_leader()?
            .as_ref()
            .and_then(LeaderRecord::from_snapshot)
            .ok_or_else(|| ConsistencyViolation::NoLeader {
                phase: format!("after switch-over {iteration}"),
            })?;
        ensure_term_advanced(previous.term, leader.term)?;
        self.record_leader(leader);

        let base = self.base_url()?;
        self.client.check_liveness(&base).await?;
        self.client
            .verify_persisted(&base, &self.config.key, &self.config.value)
            .await?;

        self.restore(previous.index).await?;
        self.report.switch_overs = iteration;
        Ok(())
    }

    /// Bring a stopped slot back so the next iteration sees a full cluster.
    async fn restore(
        &mut self,
        index: u32,
    ) -> Result<()> {
        let fresh = self.cluster.restart(index)?;
        self.cluster.replace(fresh);

        if self.config.mode == ScenarioMode::Direct {
            if let Some(handle) = self.cluster.get(index) {
                self.timing
                    .await_ready_within(handle, self.timing.config().ready_timeout())
                    .await?;
            }
        }
        Ok(())
    }

    /// Where HTTP verification goes: the gateway, or the leader itself.
    fn base_url(&self) -> Result<String> {
        match self.config.mode {
            ScenarioMode::Gateway => self
                .config
                .gateway_url
                .clone()
                .ok_or_else(|| Error::InvalidConfig("gateway mode requires scenario.gateway_url".into())),
            ScenarioMode::Direct => self.current_leader.as_ref().map(|l| l.endpoint.clone()).ok_or_else(|| {
                ConsistencyViolation::NoLeader {
                    phase: "when resolving the leader endpoint".into(),
                }
                .into()
            }),
        }
    }

    fn record_leader(
        &mut self,
        leader: LeaderRecord,
    ) {
        info!(
            "leader is instance {} (term {}, {})",
            leader.index, leader.term, leader.endpoint
        );
        self.report.leaders.push(leader.clone());
        self.current_leader = Some(leader);
    }

    fn tear_down(&mut self) {
        self.transition(ScenarioState::TearingDown);
        let stopped = self.cluster.stop_all();
        if stopped == 0 && self.cluster.instances().is_empty() {
            warn!("tear down: no instances were started");
        }
        self.transition(ScenarioState::Done);
    }

    fn transition(
        &mut self,
        next: ScenarioState,
    ) {
        info!("scenario: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
