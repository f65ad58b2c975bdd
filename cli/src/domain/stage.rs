//! Bake state machine stages.

use std::fmt;

/// One stage of an image bake. The bake walks these strictly in order;
/// `Cleanup` runs on every path once an instance exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BakeStage {
    Init,
    Provisioning,
    AwaitRunning,
    AwaitHealthy,
    AwaitSsh,
    ProvisionScript,
    Stopping,
    Snapshot,
    Cleanup,
    Done,
}

impl BakeStage {
    /// Whether a launched instance can exist at this stage, i.e. whether a
    /// failure here must run cleanup before returning.
    #[must_use]
    pub fn owns_instance(self) -> bool {
        self > Self::Provisioning && self < Self::Done
    }

    /// Human-readable progress message emitted on entering the stage.
    #[must_use]
    pub fn progress_message(self) -> &'static str {
        match self {
            Self::Init => "checking local preconditions...",
            Self::Provisioning => "launching build instance...",
            Self::AwaitRunning => "waiting for the instance to run...",
            Self::AwaitHealthy => "waiting for the instance to pass status checks...",
            Self::AwaitSsh => "waiting for ssh...",
            Self::ProvisionScript => "running provisioning script...",
            Self::Stopping => "stopping the instance...",
            Self::Snapshot => "creating image...",
            Self::Cleanup => "terminating the instance...",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for BakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Provisioning => "provisioning",
            Self::AwaitRunning => "await-running",
            Self::AwaitHealthy => "await-healthy",
            Self::AwaitSsh => "await-ssh",
            Self::ProvisionScript => "provision-script",
            Self::Stopping => "stopping",
            Self::Snapshot => "snapshot",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
