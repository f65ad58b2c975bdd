//! Readiness prober: bounded retries of a no-op remote command.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use crate::application::ports::{ProgressReporter, RemoteShell, ShellTarget};
use crate::domain::{ProbePolicy, ProbeTimeout};

/// Wait until the remote shell on `target` answers.
///
/// Attempts the no-op probe up to `policy.max_attempts()` times, sleeping
/// `policy.interval()` between attempts (never after the last one). Emits
/// one progress step per attempt.
///
/// Returns the number of attempts used.
///
/// # Errors
///
/// Returns `ProbeTimeout` once every attempt failed. Its `total_wait` is
/// `(max_attempts - 1) * interval`.
pub async fn wait_for_ssh(
    shell: &impl RemoteShell,
    target: &ShellTarget<'_>,
    policy: ProbePolicy,
    reporter: &impl ProgressReporter,
) -> Result<u32, ProbeTimeout> {
    let max_attempts = policy.max_attempts();
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        reporter.step(&format!(
            "probing ssh on {} (attempt {attempt}/{max_attempts})",
            target.address
        ));
        match shell.probe(target).await {
            Ok(()) => return Ok(attempt),
            Err(e) => last_error = format!("{e:#}"),
        }
        if attempt < max_attempts {
            tokio::time::sleep(policy.interval()).await;
        }
    }

    Err(ProbeTimeout {
        address: target.address.to_string(),
        attempts: max_attempts,
        total_wait: policy.waited_after(max_attempts),
        last_error,
    })
}
