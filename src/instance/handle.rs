use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing::warn;

use super::InstanceState;
use super::ReadySignal;

/// Launch inputs of one instance; never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams {
    /// 1-based slot, unique within a run
    pub index: u32,
    /// Private working directory (config, logs)
    pub instance_dir: PathBuf,
}

/// OS process behind an instance.
///
/// Only used to signal termination and to observe the exit status.
pub trait InstanceProcess: Send + Sync + fmt::Debug {
    fn id(&self) -> Option<u32>;

    /// Request termination without waiting for the process to exit.
    fn start_kill(&self) -> std::io::Result<()>;

    /// Exit code once the process has exited; `None` while it runs.
    fn try_exit_code(&self) -> std::io::Result<Option<i32>>;
}

#[derive(Debug)]
pub struct InstanceHandle {
    params: LaunchParams,
    endpoint: String,
    process: Box<dyn InstanceProcess>,
    state: Arc<InstanceState>,
    killed: bool,
}

impl InstanceHandle {
    pub fn new(
        params: LaunchParams,
        endpoint: String,
        process: Box<dyn InstanceProcess>,
        state: Arc<InstanceState>,
    ) -> Self {
        Self {
            params,
            endpoint,
            process,
            state,
            killed: false,
        }
    }

    pub fn index(&self) -> u32 {
        self.params.index
    }

    pub fn params(&self) -> &LaunchParams {
        &self.params
    }

    /// Base URL built from the instance's own config at launch time
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.id()
    }

    pub fn leader_of_term(&self) -> Option<u64> {
        self.state.leader_of_term()
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub fn ready_signal(&self) -> &ReadySignal {
        self.state.ready_signal()
    }

    pub fn state(&self) -> &Arc<InstanceState> {
        &self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.process.try_exit_code().ok().flatten()
    }

    /// Signal termination once; later calls are no-ops.
    ///
    /// Returns `true` when this call sent the signal.
    pub fn stop(&mut self) -> bool {
        if self.killed {
            return false;
        }
        self.killed = true;

        info!("stopping instance {} (pid={:?})", self.index(), self.pid());
        if let Err(e) = self.process.start_kill() {
            // Already exited processes refuse the signal; they are stopped either way.
            warn!("instance {} kill signal failed: {:?}", self.index(), e);
        }
        true
    }

    /// Frozen copy of everything observed about this instance.
    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            index: self.index(),
            pid: self.pid(),
            endpoint: self.endpoint.clone(),
            leader_of_term: self.leader_of_term(),
            ready: self.is_ready(),
            killed: self.killed,
        }
    }
}

/// Point-in-time view of an instance used by the leadership oracle and in
/// failure reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSnapshot {
    pub index: u32,
    pub pid: Option<u32>,
    pub endpoint: String,
    pub leader_of_term: Option<u64>,
    pub ready: bool,
    pub killed: bool,
}

impl fmt::Display for InstanceSnapshot {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "instance {} pid={:?} endpoint={} ready={} killed={} leader_of_term={:?}",
            self.index, self.pid, self.endpoint, self.ready, self.killed, self.leader_of_term
        )
    }
}
