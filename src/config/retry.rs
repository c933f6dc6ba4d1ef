use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Basic retry policy template
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single operation timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_op_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Divide strategies by verification step
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RetryPolicies {
    // Liveness, authentication and storage calls against a leader or gateway
    #[serde(default)]
    pub http: BackoffPolicy,
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        if self.http.max_retries == 0 {
            return Err(Error::InvalidConfig("retry.http.max_retries cannot be 0".into()));
        }
        if self.http.base_delay_ms > self.http.max_delay_ms {
            return Err(Error::InvalidConfig(
                "retry.http.base_delay_ms cannot exceed max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_retries() -> usize {
    5
}
fn default_op_timeout_ms() -> u64 {
    10_000
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8_000
}
