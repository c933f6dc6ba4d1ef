use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Paths of the functional oracle, relative to an instance or gateway base URL
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpConfig {
    /// UI liveness page
    #[serde(default = "default_ui_path")]
    pub ui_path: String,

    #[serde(default = "default_auth_path")]
    pub auth_path: String,

    /// Replicated key/value collection; keys are appended as the last segment
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Instances serve self-signed certificates
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            ui_path: default_ui_path(),
            auth_path: default_auth_path(),
            storage_path: default_storage_path(),
            request_timeout_ms: default_request_timeout_ms(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("ui_path", &self.ui_path),
            ("auth_path", &self.auth_path),
            ("storage_path", &self.storage_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::InvalidConfig(format!(
                    "http.{name} {path:?} must start with '/'"
                )));
            }
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request_timeout_ms cannot be 0".into()));
        }

        Ok(())
    }
}

fn default_ui_path() -> String {
    "/plugins/bootstrap/web/".into()
}
fn default_auth_path() -> String {
    "/auth".into()
}
fn default_storage_path() -> String {
    "/plugins/sample/services/hello/_current".into()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_accept_invalid_certs() -> bool {
    true
}
