//! Failover Harness Error Hierarchy
//!
//! Failures are grouped the way a test run has to report them: an instance
//! that never started, a broken election invariant, a wait that ran out of
//! time, and a leader that claims the role but does not serve correctly.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

use crate::InstanceSnapshot;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Instance process could not be started
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Election invariant broken (term uniqueness or monotonicity)
    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),

    /// A wait exceeded its allowance
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Declared leader did not serve the functional round-trip correctly
    #[error(transparent)]
    OracleMismatch(#[from] OracleMismatch),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failures (connect, TLS, body decoding)
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Election failures must never be mistaken for flakes in reporting.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, Error::Consistency(_))
    }

    pub fn is_timing_failure(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Launch and consistency failures abort the whole run; the rest only end
    /// the current step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Launch(_) | Error::Consistency(_) | Error::Config(_) | Error::InvalidConfig(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Failed to spawn instance {index} ({command}): {source}")]
    Spawn {
        index: u32,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config of instance {index} at {path}: {source}")]
    ConfigUnreadable {
        index: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config of instance {index} at {path}: {reason}")]
    ConfigMalformed {
        index: u32,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to open log sink of instance {index} at {path}: {source}")]
    LogSink {
        index: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Instance {index} started without {stream} pipe")]
    MissingPipe { index: u32, stream: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum ConsistencyViolation {
    /// More than one live instance claims leadership of the same term
    #[error("Term {term} has more than one leader: instances {instances:?}")]
    SameTermLeaders { term: u64, instances: Vec<u32> },

    /// New leader did not move the term forward
    #[error("New leader term {current} does not exceed previous leader term {previous}")]
    TermNotIncreased { previous: u64, current: u64 },

    /// No live instance claims leadership once the cluster should have converged
    #[error("No leader elected {phase}")]
    NoLeader { phase: String },

    /// Cluster finished bootstrapping with an unexpected number of leaders
    #[error("Expected exactly one leader after startup, found {found}")]
    UnexpectedLeaderCount { found: usize },
}

#[derive(Debug, thiserror::Error)]
pub struct TimeoutError {
    pub operation: String,
    pub after: Duration,
    pub last_known: Vec<InstanceSnapshot>,
}

impl fmt::Display for TimeoutError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Timed out after {:?} waiting for {}", self.after, self.operation)?;
        for snapshot in &self.last_known {
            write!(f, "; {}", snapshot)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleMismatch {
    #[error("{request} returned status {status}: {body}")]
    UnexpectedStatus {
        request: String,
        status: u16,
        body: String,
    },

    #[error("Key {key} read back {actual:?}, expected {expected:?}")]
    WrongValue {
        key: String,
        expected: String,
        actual: Option<String>,
    },

    #[error("Authentication returned no session cookie")]
    MissingSession,
}

/// Malformed leadership text in an otherwise matching log line.
///
/// Never propagated as a run failure; the detector logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed term {text:?} in line {line:?}")]
pub struct DetectorAnomaly {
    pub line: String,
    pub text: String,
}
