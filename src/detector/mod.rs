//! Lifecycle events inferred from an instance's console output.
//!
//! The text contract (a "became leader of term N" line and a ready marker) is
//! kept behind [`EventSource`], so a structured channel can replace the
//! pattern matcher without touching the cluster manager or scenario driver.

mod stream;
pub use stream::*;


use std::fmt::Debug;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::DetectorAnomaly;
use crate::InstanceState;
use crate::LauncherConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    Ready,
    BecameLeader { term: u64 },
}

pub trait EventSource: Send + Sync + Debug {
    /// Classify one line of output.
    ///
    /// `Ok(None)` for lines that carry no event.
    fn detect(
        &self,
        line: &str,
    ) -> Result<Option<LogEvent>, DetectorAnomaly>;
}

/// [`EventSource`] backed by substring matching on console text
#[derive(Debug, Clone)]
pub struct TextPatternSource {
    leader_marker: String,
    ready_marker: String,
}

impl TextPatternSource {
    pub fn new(
        leader_marker: impl Into<String>,
        ready_marker: impl Into<String>,
    ) -> Self {
        Self {
            leader_marker: leader_marker.into(),
            ready_marker: ready_marker.into(),
        }
    }

    pub fn from_config(config: &LauncherConfig) -> Self {
        Self::new(config.leader_marker.clone(), config.ready_marker.clone())
    }

    fn parse_term(
        &self,
        line: &str,
        after_marker: &str,
    ) -> Result<u64, DetectorAnomaly> {
        let token = after_marker.split_whitespace().next().unwrap_or_default();
        let digits = token.trim_end_matches([',', '.', ';', ':', ')', ']']);
        let anomaly = || DetectorAnomaly {
            line: line.to_string(),
            text: token.to_string(),
        };

        // Whole token must be the number; "12abc" is not term 12.
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anomaly());
        }
        digits.parse::<u64>().map_err(|_| anomaly())
    }
}

impl EventSource for TextPatternSource {
    fn detect(
        &self,
        line: &str,
    ) -> Result<Option<LogEvent>, DetectorAnomaly> {
        if let Some(pos) = line.find(&self.leader_marker) {
            let term = self.parse_term(line, &line[pos + self.leader_marker.len()..])?;
            return Ok(Some(LogEvent::BecameLeader { term }));
        }

        if line.contains(&self.ready_marker) {
            return Ok(Some(LogEvent::Ready));
        }

        Ok(None)
    }
}

/// Applies detected events to the state of the instance that produced them.
#[derive(Debug, Clone)]
pub struct LogEventDetector {
    source: Arc<dyn EventSource>,
    state: Arc<InstanceState>,
}

impl LogEventDetector {
    pub fn new(
        source: Arc<dyn EventSource>,
        state: Arc<InstanceState>,
    ) -> Self {
        Self { source, state }
    }

    /// Feed one line. Never fails: anomalies are logged and dropped.
    pub fn on_line(
        &self,
        line: &str,
    ) -> Option<LogEvent> {
        let index = self.state.index();
        match self.source.detect(line) {
            Ok(Some(LogEvent::BecameLeader { term })) => {
                if self.state.record_leadership(term) {
                    info!("instance {} became leader of term {}", index, term);
                }
                Some(LogEvent::BecameLeader { term })
            }
            Ok(Some(LogEvent::Ready)) => {
                if self.state.mark_ready() {
                    info!("instance {} is ready", index);
                } else {
                    debug!("instance {} repeated ready marker", index);
                }
                Some(LogEvent::Ready)
            }
            Ok(None) => None,
            Err(anomaly) => {
                warn!("instance {} detector anomaly: {}", index, anomaly);
                None
            }
        }
    }
}
