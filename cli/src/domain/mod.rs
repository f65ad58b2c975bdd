//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod instance;
pub mod request;
pub mod stage;

pub use config::{BakeConfig, validate_config};
pub use error::{BakeError, CleanupWarning, ConfigError, ProbeTimeout, UnconfirmedLaunch};
pub use instance::{BakedImage, InstanceDescription, InstanceState, build_instance_name};
pub use request::{BakePlan, BakeRequest, ProbePolicy};
pub use stage::BakeStage;
