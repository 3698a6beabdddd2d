//! Remote command execution contract.
//!
//! Everything the orchestrator does to a host goes through [`RemoteExecutor`].
//! Transport-level failures (connection refused, dropped mid-command) are
//! `Err`; a remote command that ran and exited non-zero is `Ok` with the
//! captured output, and it is the caller's job to decide what that means.

use crate::error::Result;

/// Exit code produced by the remote `timeout(1)` wrapper when a step
/// exceeds its allotted time.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn timed_out(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }
}

pub trait RemoteExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput>;
}
