// -
// Log line contract

/// Phrase a server prints when it wins an election; the term number follows.
pub const DEFAULT_LEADER_MARKER: &str = "became leader of term";

/// Phrase a server prints once it accepts requests.
pub const DEFAULT_READY_MARKER: &str = "Server is ready";

// -
// Environment block handed to every instance

pub const ENV_CLUSTER_ENABLED: &str = "RAFT_CLUSTER_ENABLED";
pub const ENV_INSTANCE_DIR: &str = "INSTANCE_DIR";
pub const ENV_WORKER_COUNT: &str = "WORKER_COUNT";
pub const ENV_LOG_FILE: &str = "LOG_FILE";
pub const ENV_CONFIG_FILE: &str = "CONFIG_FILE";

/// Single worker keeps each log line attributable to one process.
pub const SINGLE_WORKER: &str = "1";

/// Environment prefix for harness configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "HARNESS";
