use std::process::Command;

use crate::config;
use crate::error::{Error, Result};
use crate::executor::{CommandOutput, RemoteExecutor};
use crate::target::Target;

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the target host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

impl SshClient {
    pub fn from_target(target: &Target) -> Result<Self> {
        let identity_file = config::resolve_identity_file(target)?;

        let is_local = is_local_host(&target.host);
        if is_local {
            log_status!(
                "ssh",
                "Target '{}' is localhost — using local execution",
                target.name
            );
        }

        Ok(Self {
            host: target.host.clone(),
            user: target.user.clone(),
            port: target.port,
            identity_file,
            is_local,
        })
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Timeout and keepalive options prevent hangs on stalled
        // connections or unexpected prompts.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        args
    }
}

impl RemoteExecutor for SshClient {
    /// Deploy steps are not provably idempotent, so there is no automatic
    /// retry here: a transport failure surfaces immediately and the operator
    /// decides whether to re-run.
    fn run(&self, command: &str) -> Result<CommandOutput> {
        if self.is_local {
            return Ok(execute_local_command(command));
        }

        let args = self.build_ssh_args(command);
        let output = Command::new("ssh")
            .args(&args)
            .output()
            .map_err(|e| Error::transport_connect_failed(&self.host, e.to_string()))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if is_transport_error(&result) {
            return Err(Error::transport_connect_failed(
                &self.host,
                result.stderr.trim().to_string(),
            ));
        }

        Ok(result)
    }
}

pub fn execute_local_command(command: &str) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    match cmd.output() {
        Ok(out) => CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput {
            stdout: String::new(),
            stderr: format!("Command error: {}", e),
            success: false,
            exit_code: -1,
        },
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Distinguish a connection-level failure from a remote command failure.
/// SSH itself exits 255 when the connection cannot be established or drops.
fn is_transport_error(output: &CommandOutput) -> bool {
    if output.exit_code != 255 {
        return false;
    }

    let stderr = output.stderr.to_lowercase();
    let patterns = [
        "connection refused",
        "connection reset",
        "connection timed out",
        "connection closed by remote host",
        "no route to host",
        "network is unreachable",
        "temporary failure in name resolution",
        "could not resolve hostname",
        "broken pipe",
        "ssh_exchange_identification",
        "permission denied",
        "host key verification failed",
    ];

    patterns.iter().any(|p| stderr.contains(p))
}
