//! Domain types and validators for amibake configuration.
//!
//! Pure functions only, no I/O, no async, no filesystem access.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::request::{
    DEFAULT_INSTANCE_TYPE, DEFAULT_SCRIPT, DEFAULT_SSH_USER, DEFAULT_VOLUME_SIZE_GIB,
};

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.amibake/config.yaml`.
///
/// Every field has a default, so an empty or missing file is valid. CLI
/// flags override anything set here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Instance type used for the temporary build instance.
    pub instance_type: String,
    /// Login user on the base image.
    pub ssh_user: String,
    /// Local provisioning script streamed to `bash -s`.
    pub script: PathBuf,
    /// Root volume size in GiB.
    pub volume_size: u32,
    /// Upper bound on the provisioning script's run time, in seconds.
    pub script_timeout_secs: u64,
    pub probe: ProbeConfig,
    pub ssh: SshConfig,
    pub aws: AwsConfig,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            ssh_user: DEFAULT_SSH_USER.to_string(),
            script: PathBuf::from(DEFAULT_SCRIPT),
            volume_size: DEFAULT_VOLUME_SIZE_GIB,
            script_timeout_secs: 3600,
            probe: ProbeConfig::default(),
            ssh: SshConfig::default(),
            aws: AwsConfig::default(),
        }
    }
}

/// Readiness probe budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub attempts: u32,
    pub interval_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval_secs: 10,
        }
    }
}

/// ssh client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub connect_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
        }
    }
}

/// AWS CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Named profile passed as `--profile`.
    pub profile: Option<String>,
    /// Upper bound on a single `aws ec2 wait` call, in seconds.
    pub wait_timeout_secs: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            profile: None,
            wait_timeout_secs: 3600,
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns an error naming the first invalid key.
pub fn validate_config(config: &BakeConfig) -> Result<()> {
    if config.probe.attempts == 0 {
        return Err(invalid("probe.attempts", "0", "an integer >= 1"));
    }
    for (key, value) in [
        ("script_timeout_secs", config.script_timeout_secs),
        ("ssh.connect_timeout_secs", config.ssh.connect_timeout_secs),
        ("aws.wait_timeout_secs", config.aws.wait_timeout_secs),
    ] {
        if value == 0 {
            return Err(invalid(key, "0", "a number of seconds >= 1"));
        }
    }
    if config.instance_type.trim().is_empty() {
        return Err(invalid("instance_type", "\"\"", "an EC2 instance type"));
    }
    if config.ssh_user.trim().is_empty() {
        return Err(invalid("ssh_user", "\"\"", "a login user name"));
    }
    Ok(())
}

fn invalid(key: &str, value: &str, expected: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
