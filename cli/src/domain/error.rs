//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

use crate::domain::stage::BakeStage;

// ── Bake errors ───────────────────────────────────────────────────────────────

/// Every way a bake can fail. Closed set: one variant per failure kind.
#[derive(Debug, Error)]
pub enum BakeError {
    #[error("{0}")]
    Precondition(String),

    #[error("{stage} failed: {reason}")]
    Provision { stage: BakeStage, reason: String },

    #[error("instance {instance_id} did not reach {waiter}: {reason}")]
    ProvisionTimeout {
        instance_id: String,
        waiter: String,
        reason: String,
    },

    #[error(transparent)]
    SshTimeout(#[from] ProbeTimeout),

    #[error("provisioning script failed on {instance_id} ({}): {stderr}", describe_exit(.exit_code))]
    ProvisioningScript {
        instance_id: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("image creation from {instance_id} failed{}: {reason}", image_suffix(.image_id.as_deref()))]
    Snapshot {
        instance_id: String,
        image_id: Option<String>,
        reason: String,
    },
}

impl BakeError {
    /// Stable machine-readable code, used by `--json` error output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "precondition",
            Self::Provision { .. } => "provision",
            Self::ProvisionTimeout { .. } => "provision_timeout",
            Self::SshTimeout(_) => "ssh_timeout",
            Self::ProvisioningScript { .. } => "provisioning_script",
            Self::Snapshot { .. } => "snapshot",
        }
    }
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "transport error".to_string(), |c| format!("exit code {c}"))
}

fn image_suffix(image_id: Option<&str>) -> String {
    image_id.map(|id| format!(" ({id})")).unwrap_or_default()
}

// ── Probe errors ──────────────────────────────────────────────────────────────

/// The readiness probe used up its attempt budget.
///
/// `total_wait` is the time spent sleeping between attempts, which is
/// `(attempts - 1) * interval`: there is no sleep after the last attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "ssh on {address} not reachable after {attempts} attempts ({}s waited): {last_error}",
    .total_wait.as_secs()
)]
pub struct ProbeTimeout {
    pub address: String,
    pub attempts: u32,
    pub total_wait: Duration,
    pub last_error: String,
}

// ── Cleanup warnings ──────────────────────────────────────────────────────────

/// Teardown failed. Never returned as the bake error; reported as a warning.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "could not confirm termination of instance {instance_id}: {reason}\n\
     Terminate it manually: aws ec2 terminate-instances --instance-ids {instance_id}"
)]
pub struct CleanupWarning {
    pub instance_id: String,
    pub reason: String,
}

// ── Launch errors ─────────────────────────────────────────────────────────────

/// The launch request was accepted but its reply named no instance id.
///
/// An instance may be running and billing with no guard to terminate it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "launch accepted but no instance id could be read from the reply ({reason}); \
     an instance tagged Name=\"{name_tag}\" may be running. Find and terminate it: \
     aws ec2 describe-instances --filters \"Name=tag:Name,Values={name_tag}\""
)]
pub struct UnconfirmedLaunch {
    pub name_tag: String,
    pub reason: String,
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
