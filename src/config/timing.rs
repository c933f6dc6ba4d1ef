use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Wait allowances for one run (unit: seconds)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimingConfig {
    /// Upper bound for the cluster to elect its first leader
    #[serde(default = "default_startup_secs")]
    pub startup_secs: u64,

    /// Upper bound for the cluster to elect a replacement leader
    #[serde(default = "default_recovery_secs")]
    pub recovery_secs: u64,

    /// Bound on waiting for ready signals; falls back to `startup_secs` when unset
    #[serde(default)]
    pub ready_timeout_secs: Option<u64>,

    /// Overall allowance for the whole scenario; unbounded when unset
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_secs: default_startup_secs(),
            recovery_secs: default_recovery_secs(),
            ready_timeout_secs: None,
            run_timeout_secs: None,
        }
    }
}

impl TimingConfig {
    pub fn startup(&self) -> Duration {
        Duration::from_secs(self.startup_secs)
    }

    pub fn recovery(&self) -> Duration {
        Duration::from_secs(self.recovery_secs)
    }

    /// Readiness bound; the startup allowance unless overridden.
    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.startup())
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(0) = self.ready_timeout_secs {
            return Err(Error::InvalidConfig("ready_timeout_secs cannot be 0".into()));
        }
        if let Some(0) = self.run_timeout_secs {
            return Err(Error::InvalidConfig("run_timeout_secs cannot be 0".into()));
        }
        Ok(())
    }
}

fn default_startup_secs() -> u64 {
    120
}
fn default_recovery_secs() -> u64 {
    120
}
