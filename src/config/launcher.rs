use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_LEADER_MARKER;
use crate::constants::DEFAULT_READY_MARKER;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LauncherConfig {
    /// Server executable (or start script)
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory of the server process; inherits the harness cwd when unset
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Added on top of the per-instance environment block
    #[serde(default)]
    pub extra_env: HashMap<String, String>,

    /// Instance's resolved JSON config, relative to its instance directory
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,

    /// JSON pointer to the listening port inside the instance config
    #[serde(default = "default_port_pointer")]
    pub port_pointer: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Log file the server writes itself (`LOG_FILE`), relative to the instance directory
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Combined stdout/stderr captured by the harness, relative to the instance directory
    #[serde(default = "default_console_log_file")]
    pub console_log_file: PathBuf,

    #[serde(default = "default_leader_marker")]
    pub leader_marker: String,

    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: vec![],
            working_dir: None,
            extra_env: HashMap::new(),
            config_file: default_config_file(),
            port_pointer: default_port_pointer(),
            host: default_host(),
            scheme: default_scheme(),
            log_file: default_log_file(),
            console_log_file: default_console_log_file(),
            leader_marker: default_leader_marker(),
            ready_marker: default_ready_marker(),
        }
    }
}

impl LauncherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(Error::InvalidConfig("launcher.command cannot be empty".into()));
        }

        if !self.port_pointer.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "launcher.port_pointer {:?} must be a JSON pointer starting with '/'",
                self.port_pointer
            )));
        }

        if self.scheme != "http" && self.scheme != "https" {
            return Err(Error::InvalidConfig(format!(
                "launcher.scheme must be http or https, got {:?}",
                self.scheme
            )));
        }

        if self.console_log_file == self.log_file {
            return Err(Error::InvalidConfig(
                "launcher.console_log_file must differ from launcher.log_file".into(),
            ));
        }

        if self.leader_marker.is_empty() || self.ready_marker.is_empty() {
            return Err(Error::InvalidConfig("log markers cannot be empty".into()));
        }

        Ok(())
    }
}

fn default_command() -> String {
    "./bin/app-server.sh".into()
}
fn default_config_file() -> PathBuf {
    PathBuf::from("config/server.json")
}
fn default_port_pointer() -> String {
    "/node/https/port".into()
}
fn default_host() -> String {
    "localhost".into()
}
fn default_scheme() -> String {
    "https".into()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("logs/server.log")
}
fn default_console_log_file() -> PathBuf {
    PathBuf::from("logs/console.log")
}
fn default_leader_marker() -> String {
    DEFAULT_LEADER_MARKER.into()
}
fn default_ready_marker() -> String {
    DEFAULT_READY_MARKER.into()
}
