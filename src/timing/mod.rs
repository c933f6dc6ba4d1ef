//! Wait primitives for a run.
//!
//! Two strategies: event-driven waits on an instance's ready latch when its
//! output is tapped directly, and fixed allowances when the harness only sees
//! the cluster through a gateway.


use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::info;

use crate::InstanceHandle;
use crate::Result;
use crate::TimeoutError;
use crate::TimingConfig;

#[derive(Debug, Clone)]
pub struct TimingController {
    config: TimingConfig,
}

impl TimingController {
    pub fn new(config: TimingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    /// Resolves once the instance's ready marker has been seen, including when
    /// it was seen before this call. Unbounded; see [`Self::await_ready_within`].
    pub fn await_ready(
        &self,
        handle: &InstanceHandle,
    ) -> impl Future<Output = ()> + Send + 'static {
        let signal = handle.ready_signal().clone();
        async move { signal.wait().await }
    }

    pub async fn await_ready_within(
        &self,
        handle: &InstanceHandle,
        limit: Duration,
    ) -> Result<()> {
        match timeout(limit, self.await_ready(handle)).await {
            Ok(()) => Ok(()),
            Err(_) => Err(TimeoutError {
                operation: format!("instance {} to become ready", handle.index()),
                after: limit,
                last_known: vec![handle.snapshot()],
            }
            .into()),
        }
    }

    /// Wait for every instance concurrently, bounded by `TimingConfig::ready_timeout`.
    ///
    /// Total latency is that of the slowest instance.
    pub async fn await_all_ready(
        &self,
        handles: &[InstanceHandle],
    ) -> Result<()> {
        let limit = self.config.ready_timeout();
        let waits = handles.iter().map(|h| self.await_ready(h));

        match timeout(limit, join_all(waits)).await {
            Ok(_) => {
                info!("all {} instances ready", handles.len());
                Ok(())
            }
            Err(_) => Err(TimeoutError {
                operation: "all instances to become ready".into(),
                after: limit,
                last_known: handles.iter().map(InstanceHandle::snapshot).collect(),
            }
            .into()),
        }
    }

    /// Conservative upper bound for the first election.
    pub async fn await_cluster_startup(&self) {
        let allowance = self.config.startup();
        info!("waiting {:?} for cluster startup", allowance);
        sleep(allowance).await;
    }

    /// Conservative upper bound for electing a replacement leader.
    pub async fn await_recovery(&self) {
        let allowance = self.config.recovery();
        info!("waiting {:?} for recovery", allowance);
        sleep(allowance).await;
    }
}
