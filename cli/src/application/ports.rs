//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::fmt;
use std::path::Path;
use std::process::Output;

use anyhow::Result;

use crate::domain::{BakeConfig, InstanceDescription};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Launch parameters for the temporary build instance.
pub struct LaunchSpec<'a> {
    /// Base image to boot, e.g. `"ami-0123456789abcdef0"`.
    pub image_id: &'a str,
    /// Instance type, e.g. `"t2.micro"`.
    pub instance_type: &'a str,
    /// EC2 key pair name installed on the instance.
    pub key_name: &'a str,
    /// Subnet the primary network interface is placed in.
    pub subnet_id: &'a str,
    /// Security group attached to the primary network interface.
    pub security_group: &'a str,
    /// Root volume size in GiB.
    pub volume_size: u32,
    /// Value of the instance's `Name` tag.
    pub name_tag: &'a str,
}

/// Parameters for capturing an image from a stopped instance.
pub struct ImageSpec<'a> {
    pub instance_id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    /// Skip the provider-side reboot before snapshotting.
    pub no_reboot: bool,
}

/// Provider-side blocking polls. Each one returns once the resource reaches
/// the named state, or fails when the provider gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waiter {
    InstanceRunning,
    InstanceStatusOk,
    InstanceStopped,
    InstanceTerminated,
    ImageAvailable,
}

impl Waiter {
    /// Waiter name as understood by `aws ec2 wait`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::InstanceRunning => "instance-running",
            Self::InstanceStatusOk => "instance-status-ok",
            Self::InstanceStopped => "instance-stopped",
            Self::InstanceTerminated => "instance-terminated",
            Self::ImageAvailable => "image-available",
        }
    }
}

impl fmt::Display for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where and as whom to open a remote shell.
#[derive(Debug, Clone, Copy)]
pub struct ShellTarget<'a> {
    pub address: &'a str,
    pub user: &'a str,
    pub key_path: &'a Path,
}

// ── Provider Port Traits ──────────────────────────────────────────────────────

/// Instance lifecycle operations: launch, stop, terminate.
#[allow(async_fn_in_trait)]
pub trait InstanceLifecycle {
    /// Launch one instance and return its id.
    async fn launch(&self, spec: &LaunchSpec<'_>) -> Result<String>;
    /// Request a stop. Does not wait.
    async fn stop(&self, instance_id: &str) -> Result<()>;
    /// Request termination. Does not wait.
    async fn terminate(&self, instance_id: &str) -> Result<()>;
}

/// Instance inspection.
#[allow(async_fn_in_trait)]
pub trait InstanceInspector {
    /// Describe an instance. `Ok(None)` when the provider no longer knows it.
    async fn describe(&self, instance_id: &str) -> Result<Option<InstanceDescription>>;
}

/// Image creation.
#[allow(async_fn_in_trait)]
pub trait ImageCapture {
    /// Request an image from an instance and return the new image id.
    async fn create_image(&self, spec: &ImageSpec<'_>) -> Result<String>;
}

/// Blocking provider waiters.
#[allow(async_fn_in_trait)]
pub trait ProviderWaiter {
    /// Block until `resource_id` satisfies `waiter`.
    async fn wait(&self, waiter: Waiter, resource_id: &str) -> Result<()>;
}

/// Composite trait: any type implementing all four sub-traits is an `ImageProvider`.
pub trait ImageProvider: InstanceLifecycle + InstanceInspector + ImageCapture + ProviderWaiter {}

/// Blanket implementation: any type implementing all four sub-traits is an `ImageProvider`.
impl<T> ImageProvider for T where
    T: InstanceLifecycle + InstanceInspector + ImageCapture + ProviderWaiter
{
}

// ── Remote Shell Port ─────────────────────────────────────────────────────────

/// Command execution on the build instance.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Run a no-op remote command. `Ok` only when the shell answered with
    /// exit code 0.
    async fn probe(&self, target: &ShellTarget<'_>) -> Result<()>;
    /// Stream `script` to a remote `bash -s` and capture its output.
    async fn run_script(&self, target: &ShellTarget<'_>, script: &[u8]) -> Result<Output>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
}

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Abstracts configuration loading.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<BakeConfig>;
    /// Path of the configuration file this store reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<std::path::PathBuf>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
