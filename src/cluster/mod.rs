//! Owns the instance set of one run.
//!
//! Nothing here is global: two managers (two concurrent runs) share no state.
//! Dropping the manager stops every instance it still owns.


use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::find_leader;
use crate::find_leaders;
use crate::ClusterConfig;
use crate::ConsistencyViolation;
use crate::InstanceHandle;
use crate::InstanceSnapshot;
use crate::LaunchParams;
use crate::Launcher;
use crate::Result;

pub struct ClusterManager<L: Launcher> {
    config: ClusterConfig,
    launcher: L,
    instances: Vec<InstanceHandle>,
}

impl<L: Launcher> ClusterManager<L> {
    pub fn new(
        config: ClusterConfig,
        launcher: L,
    ) -> Self {
        Self {
            config,
            launcher,
            instances: Vec::new(),
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Launch params for slots `1..=count` under the configured instances root.
    pub fn launch_params(
        &self,
        count: u32,
    ) -> Vec<LaunchParams> {
        (1..=count)
            .map(|index| LaunchParams {
                index,
                instance_dir: self.config.instance_dir(index),
            })
            .collect()
    }

    /// Start `count` instances. Launching does not wait for readiness, so all
    /// processes come up concurrently.
    ///
    /// Instances launched before a failure stay owned by the manager and are
    /// stopped on teardown.
    pub fn create_instances(
        &mut self,
        count: u32,
    ) -> Result<&[InstanceHandle]> {
        for params in self.launch_params(count) {
            let handle = self.launcher.launch(&params)?;
            if let Some(old) = self.replace(handle) {
                warn!("create_instances replaced live slot {}", old.index());
            }
        }
        info!("created {} instances", count);
        Ok(&self.instances)
    }

    pub fn instances(&self) -> &[InstanceHandle] {
        &self.instances
    }

    pub fn get(
        &self,
        index: u32,
    ) -> Option<&InstanceHandle> {
        self.instances.iter().find(|h| h.index() == index)
    }

    /// Idempotent: stopping an already stopped instance is a no-op.
    ///
    /// Returns whether a kill signal was sent.
    pub fn stop(
        &mut self,
        index: u32,
    ) -> bool {
        match self.instances.iter_mut().find(|h| h.index() == index) {
            Some(handle) => handle.stop(),
            None => {
                warn!("stop: no instance in slot {}", index);
                false
            }
        }
    }

    /// Stop every instance not already stopped.
    pub fn stop_all(&mut self) -> usize {
        let stopped = self.instances.iter_mut().filter(|h| !h.is_killed()).map(|h| h.stop()).filter(|sent| *sent).count();
        debug!("stop_all signalled {} instances", stopped);
        stopped
    }

    /// Launch a fresh handle with the same params as `index`'s current one.
    ///
    /// The new handle is not tracked until passed to [`Self::replace`].
    pub fn restart(
        &self,
        index: u32,
    ) -> Result<InstanceHandle> {
        let params = match self.get(index) {
            Some(handle) => handle.params().clone(),
            None => LaunchParams {
                index,
                instance_dir: self.config.instance_dir(index),
            },
        };
        info!("restarting instance {}", index);
        self.launcher.launch(&params)
    }

    /// Track `handle` in its slot, returning the handle it displaced.
    pub fn replace(
        &mut self,
        handle: InstanceHandle,
    ) -> Option<InstanceHandle> {
        match self.instances.iter_mut().find(|h| h.index() == handle.index()) {
            Some(slot) => Some(std::mem::replace(slot, handle)),
            None => {
                self.instances.push(handle);
                self.instances.sort_by_key(InstanceHandle::index);
                None
            }
        }
    }

    /// Frozen view of every tracked instance, in slot order.
    pub fn snapshot(&self) -> Vec<InstanceSnapshot> {
        self.instances.iter().map(InstanceHandle::snapshot).collect()
    }

    pub fn find_leader(&self) -> std::result::Result<Option<InstanceSnapshot>, ConsistencyViolation> {
        find_leader(&self.snapshot())
    }

    pub fn find_leaders(&self) -> std::result::Result<Vec<InstanceSnapshot>, ConsistencyViolation> {
        find_leaders(&self.snapshot())
    }
}

impl<L: Launcher> Drop for ClusterManager<L> {
    fn drop(&mut self) {
        let stopped = self.stop_all();
        if stopped > 0 {
            warn!("cluster dropped with {} running instances; stopped them", stopped);
        }
    }
}
