//! Instance and image value types.
//!
//! Pure data: no I/O, no async.

use std::fmt;

/// EC2 instance lifecycle state, as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
    Unknown,
}

impl InstanceState {
    /// Parse the provider's state name (`State.Name` in EC2 responses).
    #[must_use]
    pub fn from_provider(name: &str) -> Self {
        match name {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            _ => Self::Unknown,
        }
    }

    /// No terminate call is needed from this state.
    #[must_use]
    pub fn is_terminated(self) -> bool {
        self == Self::Terminated
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Snapshot of an instance as last described by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescription {
    pub instance_id: String,
    pub state: InstanceState,
    pub private_ip: Option<String>,
}

/// The image produced by a successful bake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedImage {
    pub image_id: String,
    pub name: String,
    pub instance_id: String,
}

/// Name tag applied to the temporary build instance.
#[must_use]
pub fn build_instance_name(ami_name: &str) -> String {
    format!("Temp instance to create: {ami_name}")
}
