//! Bake request types and their pure validators.
//!
//! Filesystem checks (key file, script) live in the bake service preflight;
//! everything here is a pure function of the input values.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::domain::error::BakeError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_VOLUME_SIZE_GIB: u32 = 30;
pub const MAX_VOLUME_SIZE_GIB: u32 = 16_384;
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
pub const DEFAULT_SSH_USER: &str = "ec2-user";
pub const DEFAULT_SCRIPT: &str = "init.sh";

static AMI_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ami-[0-9a-f]{1,17}$").unwrap_or_else(|e| unreachable!("{e}"))
});

// EC2 image names: 3-128 chars of letters, digits, ( ) [ ] space . / - ' @ _
static AMI_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9 ()\[\]./\-'@_]{3,128}$").unwrap_or_else(|e| unreachable!("{e}"))
});

// ── Request ──────────────────────────────────────────────────────────────────

/// Everything that identifies one bake. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakeRequest {
    pub base_ami: String,
    pub ami_name: String,
    pub region: String,
    pub subnet_id: String,
    pub security_group: String,
    pub key_name: String,
    pub key_path: PathBuf,
    pub volume_size: u32,
}

impl BakeRequest {
    /// Check the request's value invariants.
    ///
    /// # Errors
    ///
    /// Returns `BakeError::Precondition` naming the first invalid field.
    pub fn validate(&self) -> Result<(), BakeError> {
        if !AMI_ID.is_match(&self.base_ami) {
            return Err(precondition(format!(
                "invalid base image id '{}': expected ami- followed by hex digits",
                self.base_ami
            )));
        }
        if !AMI_NAME.is_match(&self.ami_name) {
            return Err(precondition(format!(
                "invalid image name '{}': 3-128 characters of letters, digits, spaces and ()[]./-'@_",
                self.ami_name
            )));
        }
        if self.region.trim().is_empty() {
            return Err(precondition("region must not be empty"));
        }
        if !self.subnet_id.starts_with("subnet-") {
            return Err(precondition(format!(
                "invalid subnet id '{}': expected subnet-...",
                self.subnet_id
            )));
        }
        if !self.security_group.starts_with("sg-") {
            return Err(precondition(format!(
                "invalid security group id '{}': expected sg-...",
                self.security_group
            )));
        }
        if self.key_name.trim().is_empty() {
            return Err(precondition("key pair name must not be empty"));
        }
        if self.volume_size == 0 || self.volume_size > MAX_VOLUME_SIZE_GIB {
            return Err(precondition(format!(
                "invalid volume size {} GiB: expected 1..={MAX_VOLUME_SIZE_GIB}",
                self.volume_size
            )));
        }
        Ok(())
    }
}

fn precondition(msg: impl Into<String>) -> BakeError {
    BakeError::Precondition(msg.into())
}

// ── Probe policy ─────────────────────────────────────────────────────────────

/// Retry budget for the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    max_attempts: u32,
    interval: Duration,
}

impl ProbePolicy {
    /// # Errors
    ///
    /// Returns `BakeError::Precondition` when `max_attempts` is zero.
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self, BakeError> {
        if max_attempts == 0 {
            return Err(precondition("probe attempts must be at least 1"));
        }
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep time accumulated after `attempts` failed attempts, saturating at
    /// `Duration::MAX`.
    #[must_use]
    pub fn waited_after(&self, attempts: u32) -> Duration {
        self.interval
            .checked_mul(attempts.saturating_sub(1))
            .unwrap_or(Duration::MAX)
    }
}

// ── Plan ─────────────────────────────────────────────────────────────────────

/// How to bake: settings that come from config and flags rather than the
/// request identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakePlan {
    pub instance_type: String,
    pub ssh_user: String,
    pub script: PathBuf,
    pub probe: ProbePolicy,
}

// ── Unit tests ───────────────────────────────────────────────────────────────
