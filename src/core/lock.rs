//! Advisory per-target deploy lock.
//!
//! Two deploys racing for the same target would both mutate the single
//! `current` pointer, so a run holds a lock directory under the target home
//! for its whole duration. `mkdir` without `-p` is atomic on POSIX: exactly
//! one contender observes success.

use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;
use crate::layout::ReleaseLayout;
use crate::target::TargetName;
use crate::utils::shell;

pub struct DeployLock<'a> {
    executor: &'a dyn RemoteExecutor,
    path: String,
    held: bool,
}

impl<'a> DeployLock<'a> {
    pub fn acquire(
        executor: &'a dyn RemoteExecutor,
        target: TargetName,
        layout: &ReleaseLayout,
    ) -> Result<Self> {
        let path = layout.lock_path();
        let command = format!(
            "mkdir -p {} && mkdir {}",
            shell::quote_path(layout.home()),
            shell::quote_path(&path),
        );

        let output = executor.run(&command)?;
        if !output.success {
            return Err(Error::lock_held(target.as_str(), path));
        }

        log_status!("lock", "Acquired deploy lock at {}", path);
        Ok(Self {
            executor,
            path,
            held: true,
        })
    }

    pub fn release(mut self) -> Result<()> {
        self.held = false;
        let output = self
            .executor
            .run(&format!("rmdir {}", shell::quote_path(&self.path)))?;
        if !output.success {
            return Err(Error::internal_unexpected(format!(
                "Failed to release deploy lock {}: {}",
                self.path,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Drop for DeployLock<'_> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        // Best effort: a failed run must not leave the target permanently
        // locked when the transport is still up.
        let command = format!("rmdir {}", shell::quote_path(&self.path));
        if self.executor.run(&command).is_err() {
            log_status!("lock", "Could not release deploy lock at {}", self.path);
        }
    }
}
