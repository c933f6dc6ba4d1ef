//! Configuration management for a failover run.
//!
//! Configuration is layered with priority:
//! 1. Default values (hardcoded)
//! 2. Config file (explicit path, or `CONFIG_PATH`)
//! 3. Environment variables prefixed `HARNESS__` (highest priority)
//!
//! Timing values live here rather than in process-wide state so two runs in
//! one process never share them.

mod cluster;
mod http;
mod launcher;
mod retry;
mod scenario;
mod timing;
pub use cluster::*;
pub use http::*;
pub use launcher::*;
pub use retry::*;
pub use scenario::*;
pub use timing::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::constants::CONFIG_ENV_PREFIX;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HarnessConfig {
    /// Instance count and directory layout
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// How each server process is started and observed
    #[serde(default)]
    pub launcher: LauncherConfig,
    /// Startup/recovery allowances
    #[serde(default)]
    pub timing: TimingConfig,
    /// Failover script parameters
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// Functional oracle endpoints
    #[serde(default)]
    pub http: HttpConfig,
    /// Retry policies for verification calls
    #[serde(default)]
    pub retry: RetryPolicies,
}

impl HarnessConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// # Arguments
    /// * `config_path` - Optional config file; falls back to `CONFIG_PATH`
    ///
    /// # Errors
    /// Returns `Error::Config` when a source cannot be parsed and
    /// `Error::InvalidConfig` when the merged result fails validation.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if let Ok(path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        debug!("loaded harness config: {:?}", config);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        self.launcher.validate()?;
        self.timing.validate()?;
        self.scenario.validate()?;
        self.http.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}
