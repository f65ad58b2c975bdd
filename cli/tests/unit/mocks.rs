//! Shared mock infrastructure for unit tests.
//!
//! Provides a scripted `CommandRunner`, an in-memory provider, a remote
//! shell stub, and a recording reporter so each test file doesn't have to
//! re-define the same boilerplate.

#![allow(clippy::expect_used, dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::time::Duration;

use amibake_cli::application::ports::{
    CommandRunner, ImageCapture, ImageSpec, InstanceInspector, InstanceLifecycle, LaunchSpec,
    ProgressReporter, ProviderWaiter, RemoteShell, ShellTarget, Waiter,
};
use amibake_cli::domain::{InstanceDescription, InstanceState, UnconfirmedLaunch};
use anyhow::Result;

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(code << 8),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Mock: scripted command runner ────────────────────────────────────────────

/// A `CommandRunner` that records every `(program, args, timeout)` call and
/// replies from a queue of canned outputs. An empty queue replies with an
/// empty successful output.
#[derive(Default)]
pub struct MockCommandRunner {
    pub calls: RefCell<Vec<(String, Vec<String>, Option<Duration>)>>,
    pub replies: RefCell<VecDeque<Output>>,
}

impl MockCommandRunner {
    pub fn with_replies(replies: impl IntoIterator<Item = Output>) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            replies: RefCell::new(replies.into_iter().collect()),
        }
    }

    /// Argument lists of every recorded call.
    pub fn args(&self) -> Vec<Vec<String>> {
        self.calls.borrow().iter().map(|(_, a, _)| a.clone()).collect()
    }

    fn record(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Output {
        self.calls.borrow_mut().push((
            program.to_owned(),
            args.iter().map(ToString::to_string).collect(),
            timeout,
        ));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| ok_output(b""))
    }
}

impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        Ok(self.record(program, args, None))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        Ok(self.record(program, args, Some(timeout)))
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], _input: &[u8]) -> Result<Output> {
        Ok(self.record(program, args, None))
    }
}

// ── Mock: provider ───────────────────────────────────────────────────────────

pub const INSTANCE_ID: &str = "i-0123456789abcdef0";
pub const IMAGE_ID: &str = "ami-9999";

/// Provider that tracks one instance's state and counts terminate calls.
/// `fail_on` names an operation (`"launch"`, `"stop"`, `"create_image"`,
/// `"terminate"`, or a waiter name) that should fail. `"launch_unconfirmed"`
/// makes launch fail as if the reply carried no instance id.
pub struct MemoryProvider {
    pub state: Cell<Option<InstanceState>>,
    pub terminate_calls: Cell<u32>,
    pub provider_calls: Cell<u32>,
    pub fail_on: Option<&'static str>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            state: Cell::new(None),
            terminate_calls: Cell::new(0),
            provider_calls: Cell::new(0),
            fail_on: None,
        }
    }

    pub fn failing_on(op: &'static str) -> Self {
        Self {
            fail_on: Some(op),
            ..Self::new()
        }
    }

    fn enter(&self, op: &str) -> Result<()> {
        self.provider_calls.set(self.provider_calls.get() + 1);
        if self.fail_on == Some(op) {
            anyhow::bail!("{op} rejected by provider");
        }
        Ok(())
    }
}

impl InstanceLifecycle for MemoryProvider {
    async fn launch(&self, spec: &LaunchSpec<'_>) -> Result<String> {
        self.enter("launch")?;
        if self.fail_on == Some("launch_unconfirmed") {
            return Err(UnconfirmedLaunch {
                name_tag: spec.name_tag.to_string(),
                reason: "reply listed no instances".to_string(),
            }
            .into());
        }
        self.state.set(Some(InstanceState::Pending));
        Ok(INSTANCE_ID.to_string())
    }

    async fn stop(&self, _: &str) -> Result<()> {
        self.enter("stop")?;
        self.state.set(Some(InstanceState::Stopping));
        Ok(())
    }

    async fn terminate(&self, _: &str) -> Result<()> {
        self.terminate_calls.set(self.terminate_calls.get() + 1);
        self.enter("terminate")?;
        self.state.set(Some(InstanceState::ShuttingDown));
        Ok(())
    }
}

impl InstanceInspector for MemoryProvider {
    async fn describe(&self, id: &str) -> Result<Option<InstanceDescription>> {
        self.enter("describe")?;
        Ok(self.state.get().map(|state| InstanceDescription {
            instance_id: id.to_string(),
            state,
            private_ip: Some("10.0.0.5".to_string()),
        }))
    }
}

impl ImageCapture for MemoryProvider {
    async fn create_image(&self, _: &ImageSpec<'_>) -> Result<String> {
        self.enter("create_image")?;
        Ok(IMAGE_ID.to_string())
    }
}

impl ProviderWaiter for MemoryProvider {
    async fn wait(&self, waiter: Waiter, _: &str) -> Result<()> {
        self.enter(waiter.name())?;
        let next = match waiter {
            Waiter::InstanceRunning | Waiter::InstanceStatusOk => InstanceState::Running,
            Waiter::InstanceStopped => InstanceState::Stopped,
            Waiter::InstanceTerminated => InstanceState::Terminated,
            Waiter::ImageAvailable => return Ok(()),
        };
        self.state.set(Some(next));
        Ok(())
    }
}

// ── Mock: remote shell ───────────────────────────────────────────────────────

/// Remote shell that answers probes from attempt `ready_on` and exits the
/// script with `script_exit`.
pub struct StubShell {
    pub ready_on: u32,
    pub probes: Cell<u32>,
    pub script_exit: i32,
}

impl StubShell {
    pub fn ready() -> Self {
        Self {
            ready_on: 1,
            probes: Cell::new(0),
            script_exit: 0,
        }
    }
}

impl RemoteShell for StubShell {
    async fn probe(&self, _: &ShellTarget<'_>) -> Result<()> {
        self.probes.set(self.probes.get() + 1);
        anyhow::ensure!(self.probes.get() >= self.ready_on, "Connection timed out");
        Ok(())
    }

    async fn run_script(&self, _: &ShellTarget<'_>, _: &[u8]) -> Result<Output> {
        if self.script_exit == 0 {
            Ok(ok_output(b"done\n"))
        } else {
            Ok(err_output(self.script_exit, b"line 3: badcmd: command not found\n"))
        }
    }
}

// ── Mock: reporter ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    pub steps: RefCell<Vec<String>>,
    pub warnings: RefCell<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.steps.borrow_mut().push(message.to_string());
    }
    fn success(&self, _message: &str) {}
    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}
