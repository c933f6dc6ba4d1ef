use parking_lot::RwLock;
use tracing::warn;

use super::ReadySignal;

/// Leadership and readiness observed for one instance.
///
/// Written only by the instance's own log reader tasks.
#[derive(Debug)]
pub struct InstanceState {
    index: u32,
    leader_of_term: RwLock<Option<u64>>,
    ready: ReadySignal,
}

impl InstanceState {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            leader_of_term: RwLock::new(None),
            ready: ReadySignal::new(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Record that this instance announced leadership of `term`.
    ///
    /// Set once: the first announcement wins for the lifetime of the handle.
    /// Returns whether the value was recorded.
    pub fn record_leadership(
        &self,
        term: u64,
    ) -> bool {
        let mut guard = self.leader_of_term.write();
        match *guard {
            None => {
                *guard = Some(term);
                true
            }
            Some(existing) => {
                if existing != term {
                    warn!(
                        "instance {} announced term {} but is already leader of term {}; keeping first",
                        self.index, term, existing
                    );
                }
                false
            }
        }
    }

    pub fn leader_of_term(&self) -> Option<u64> {
        *self.leader_of_term.read()
    }

    /// Returns `true` only on the first ready announcement.
    pub fn mark_ready(&self) -> bool {
        self.ready.fire()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_fired()
    }

    pub fn ready_signal(&self) -> &ReadySignal {
        &self.ready
    }
}
