//! Infrastructure implementation of the `RemoteShell` port.
//!
//! `SshShell<R>` runs the system `ssh` client through a `CommandRunner`. The
//! build instance is fresh and disposable, so host keys are neither checked
//! nor recorded.

use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, RemoteShell, ShellTarget};

/// Upper bound on a single readiness probe, on top of `ConnectTimeout`.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Infrastructure adapter over the system `ssh` binary.
///
/// `probe_runner` carries a short timeout; `script_runner` carries the
/// provisioning script's timeout.
pub struct SshShell<R: CommandRunner> {
    probe_runner: R,
    script_runner: R,
    connect_timeout: Duration,
}

impl<R: CommandRunner> SshShell<R> {
    pub fn new(probe_runner: R, script_runner: R, connect_timeout: Duration) -> Self {
        Self {
            probe_runner,
            script_runner,
            connect_timeout,
        }
    }

    /// Full `ssh` argument list for running `remote` on `target`.
    #[must_use]
    pub fn ssh_args(&self, target: &ShellTarget<'_>, remote: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            target.key_path.display().to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            format!("{}@{}", target.user, target.address),
            remote.to_string(),
        ]
    }
}

impl<R: CommandRunner> RemoteShell for SshShell<R> {
    async fn probe(&self, target: &ShellTarget<'_>) -> Result<()> {
        let args = self.ssh_args(target, "true");
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .probe_runner
            .run("ssh", &argv)
            .await
            .with_context(|| format!("ssh probe {}", target.address))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "ssh exited with {}: {}",
            output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string()),
            stderr.trim()
        )
    }

    async fn run_script(&self, target: &ShellTarget<'_>, script: &[u8]) -> Result<Output> {
        let args = self.ssh_args(target, "bash -s");
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.script_runner
            .run_with_stdin("ssh", &argv, script)
            .await
            .with_context(|| format!("ssh provisioning on {}", target.address))
    }
}
