//! Application context: unified state passed to the command handler.
//!
//! `AppContext` owns the output context and loaded configuration, and builds
//! the infrastructure adapters once the target region is known.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::BakeConfig;
use crate::infra::aws::AwsCliProvider;
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::infra::config::YamlConfigStore;
use crate::infra::ssh::{PROBE_TIMEOUT, SshShell};
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Explicit config file, overriding the default location.
    pub config: Option<PathBuf>,
}

/// Unified application context passed to the command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Loaded and validated configuration.
    pub config: BakeConfig,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is unreadable or invalid.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let store = YamlConfigStore::new(flags.config.clone());
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config: store.load()?,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Provider adapter for `region`.
    #[must_use]
    pub fn provider(
        &self,
        region: &str,
        profile: Option<&str>,
    ) -> AwsCliProvider<TokioCommandRunner> {
        AwsCliProvider::new(
            TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            region,
            profile,
            Duration::from_secs(self.config.aws.wait_timeout_secs),
        )
    }

    /// Remote shell adapter using the configured ssh and script timeouts.
    #[must_use]
    pub fn shell(&self) -> SshShell<TokioCommandRunner> {
        let connect_timeout = Duration::from_secs(self.config.ssh.connect_timeout_secs);
        SshShell::new(
            TokioCommandRunner::new(PROBE_TIMEOUT + connect_timeout),
            TokioCommandRunner::new(Duration::from_secs(self.config.script_timeout_secs)),
            connect_timeout,
        )
    }
}
