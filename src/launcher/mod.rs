//! Starting one server instance as an OS process.
//!
//! [`Launcher`] is the "start instance" primitive the cluster manager is
//! written against; [`ProcessLauncher`] is the implementation that spawns a
//! real child process and taps its output.

mod endpoint;
mod process;
pub use endpoint::*;
pub use process::*;


use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;

use crate::constants::ENV_CLUSTER_ENABLED;
use crate::constants::ENV_CONFIG_FILE;
use crate::constants::ENV_INSTANCE_DIR;
use crate::constants::ENV_LOG_FILE;
use crate::constants::ENV_WORKER_COUNT;
use crate::constants::SINGLE_WORKER;
use crate::consume_stream;
use crate::file_io::open_file_for_append;
use crate::EventSource;
use crate::InstanceHandle;
use crate::InstanceState;
use crate::LaunchError;
use crate::LaunchParams;
use crate::LauncherConfig;
use crate::LogEventDetector;
use crate::Result;
use crate::TextPatternSource;

#[cfg_attr(test, automock)]
pub trait Launcher: Send + Sync {
    /// Start the instance described by `params` and return its handle.
    ///
    /// Returns as soon as the process has been requested to start; readiness
    /// is observed later through the handle. No retries.
    fn launch(
        &self,
        params: &LaunchParams,
    ) -> Result<InstanceHandle>;
}

#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: LauncherConfig,
    source: Arc<dyn EventSource>,
}

impl ProcessLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        let source = Arc::new(TextPatternSource::from_config(&config));
        Self { config, source }
    }

    /// Use a different event source than the configured text markers.
    pub fn with_event_source(
        config: LauncherConfig,
        source: Arc<dyn EventSource>,
    ) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Command with the per-instance environment block applied.
    pub fn command(
        &self,
        params: &LaunchParams,
    ) -> Command {
        let instance_dir = absolute(&params.instance_dir);
        let mut cmd = Command::new(&self.config.command);

        cmd.args(&self.config.args)
            .env(ENV_CLUSTER_ENABLED, "YES")
            .env(ENV_INSTANCE_DIR, &instance_dir)
            .env(ENV_WORKER_COUNT, SINGLE_WORKER)
            .env(ENV_LOG_FILE, instance_dir.join(&self.config.log_file))
            .env(ENV_CONFIG_FILE, instance_dir.join(&self.config.config_file))
            .envs(&self.config.extra_env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &self.config.working_dir {
            cmd.current_dir(cwd);
        }

        cmd
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        params: &LaunchParams,
    ) -> Result<InstanceHandle> {
        let index = params.index;

        // Port comes from the instance's own config, read once before spawning.
        let endpoint = resolve_endpoint(&self.config, params)?;

        let log_path = params.instance_dir.join(&self.config.console_log_file);
        let log_file = open_file_for_append(&log_path).map_err(|source| LaunchError::LogSink {
            index,
            path: log_path.clone(),
            source,
        })?;
        let sink = Arc::new(Mutex::new(tokio::fs::File::from_std(log_file)));

        let mut child = self.command(params).spawn().map_err(|source| LaunchError::Spawn {
            index,
            command: self.config.command.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or(LaunchError::MissingPipe {
            index,
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or(LaunchError::MissingPipe {
            index,
            stream: "stderr",
        })?;

        let state = Arc::new(InstanceState::new(index));
        let detector = LogEventDetector::new(self.source.clone(), state.clone());

        tokio::spawn(consume_stream(stdout, sink.clone(), detector.clone(), "stdout"));
        tokio::spawn(consume_stream(stderr, sink, detector, "stderr"));

        let process = ChildProcess::new(child);
        info!(
            "launched instance {} (pid={:?}) at {} logging to {}",
            index,
            process.pid(),
            endpoint,
            log_path.display()
        );
        debug!("instance {} dir: {}", index, params.instance_dir.display());

        Ok(InstanceHandle::new(params.clone(), endpoint, Box::new(process), state))
    }
}

fn absolute(path: &Path) -> std::path::PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
