use parking_lot::Mutex;
use tokio::process::Child;

use crate::InstanceProcess;

/// [`InstanceProcess`] over a tokio child process
#[derive(Debug)]
pub struct ChildProcess {
    pid: Option<u32>,
    child: Mutex<Child>,
}

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Mutex::new(child),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl InstanceProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn start_kill(&self) -> std::io::Result<()> {
        self.child.lock().start_kill()
    }

    fn try_exit_code(&self) -> std::io::Result<Option<i32>> {
        // Killed by signal reports no code; -1 keeps "exited" distinguishable from "running".
        Ok(self
            .child
            .lock()
            .try_wait()?
            .map(|status| status.code().unwrap_or(-1)))
    }
}
