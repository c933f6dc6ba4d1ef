use std::sync::Arc;

use tokio::sync::watch;

/// Fire-once readiness latch.
///
/// Remembers that it fired, so a waiter that subscribes after the fire
/// returns immediately instead of missing the notification.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns `true` only for the call that actually fired the latch.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close underneath us.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
