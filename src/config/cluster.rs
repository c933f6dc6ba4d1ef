use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Number of instances started per run
    #[serde(default = "default_instance_count")]
    pub instance_count: u32,

    /// Parent directory holding one private directory per instance
    #[serde(default = "default_instances_root")]
    pub instances_root: PathBuf,

    /// Instance directories are `<instances_root>/<prefix><index>`
    #[serde(default = "default_instance_dir_prefix")]
    pub instance_dir_prefix: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            instance_count: default_instance_count(),
            instances_root: default_instances_root(),
            instance_dir_prefix: default_instance_dir_prefix(),
        }
    }
}

impl ClusterConfig {
    /// Private working directory for the instance with the given 1-based index
    pub fn instance_dir(
        &self,
        index: u32,
    ) -> PathBuf {
        self.instances_root
            .join(format!("{}{}", self.instance_dir_prefix, index))
    }

    pub fn validate(&self) -> Result<()> {
        if self.instance_count == 0 {
            return Err(Error::InvalidConfig(
                "instance_count must be at least 1".into(),
            ));
        }

        if self.instances_root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "instances_root path cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

fn default_instance_count() -> u32 {
    3
}
fn default_instances_root() -> PathBuf {
    PathBuf::from("./instances")
}
fn default_instance_dir_prefix() -> String {
    "instance".into()
}
