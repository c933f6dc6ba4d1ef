use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// How the driver reaches the cluster
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    /// Harness taps every instance's logs and talks to the leader's own endpoint
    #[default]
    Direct,
    /// Harness only reaches a fronting gateway; waits fall back to fixed allowances
    Gateway,
}

impl fmt::Display for ScenarioMode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ScenarioMode::Direct => write!(f, "direct"),
            ScenarioMode::Gateway => write!(f, "gateway"),
        }
    }
}

impl FromStr for ScenarioMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(ScenarioMode::Direct),
            "gateway" => Ok(ScenarioMode::Gateway),
            other => Err(Error::InvalidConfig(format!("unknown scenario mode {other:?}"))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub mode: ScenarioMode,

    /// Base URL of the fronting gateway; required in gateway mode
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Number of kill-leader cycles
    #[serde(default = "default_switch_over_count")]
    pub switch_over_count: usize,

    #[serde(default = "default_key")]
    pub key: String,

    #[serde(default = "default_value")]
    pub value: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            mode: ScenarioMode::default(),
            gateway_url: None,
            switch_over_count: default_switch_over_count(),
            key: default_key(),
            value: default_value(),
            username: default_username(),
            password: String::new(),
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mode == ScenarioMode::Gateway && self.gateway_url.is_none() {
            return Err(Error::InvalidConfig(
                "gateway_url is required in gateway mode".into(),
            ));
        }

        if self.key.is_empty() {
            return Err(Error::InvalidConfig("scenario.key cannot be empty".into()));
        }

        Ok(())
    }
}

fn default_switch_over_count() -> usize {
    20
}
fn default_key() -> String {
    "123".into()
}
fn default_value() -> String {
    "456".into()
}
fn default_username() -> String {
    "1".into()
}
