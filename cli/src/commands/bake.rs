//! Bake command: merges flags with config and runs the bake service.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::bake::bake;
use crate::domain::{BakeConfig, BakePlan, BakeRequest, ProbePolicy};
use crate::output::json;
use crate::output::reporter::TerminalReporter;

/// Upper bound accepted for `--probe_interval`.
pub const MAX_PROBE_INTERVAL_SECS: u64 = 86_400;

/// Arguments for a bake.
///
/// Long names use underscores; kebab-case aliases are accepted too.
#[derive(Args, Debug, Clone)]
pub struct BakeArgs {
    /// Base image to boot, e.g. ami-0123456789abcdef0
    #[arg(long = "base_ami", alias = "base-ami", value_name = "AMI_ID")]
    pub base_ami: String,

    /// Name of the image to create
    #[arg(long = "ami_name", alias = "ami-name", value_name = "NAME")]
    pub ami_name: String,

    /// Region to bake in, e.g. us-east-1
    #[arg(long)]
    pub region: String,

    /// Subnet for the build instance (must be reachable from this host)
    #[arg(long = "subnet_id", alias = "subnet-id", value_name = "SUBNET_ID")]
    pub subnet_id: String,

    /// Security group allowing inbound ssh from this host
    #[arg(long = "security_group", alias = "security-group", value_name = "SG_ID")]
    pub security_group: String,

    /// EC2 key pair installed on the build instance
    #[arg(long = "key_name", alias = "key-name", value_name = "NAME")]
    pub key_name: String,

    /// Local private key matching --key_name
    #[arg(long = "key_path", alias = "key-path", value_name = "PATH")]
    pub key_path: PathBuf,

    /// Root volume size in GiB [default: 30]
    #[arg(long = "volume_size", alias = "volume-size", value_name = "GiB")]
    pub volume_size: Option<u32>,

    /// Instance type for the build instance [default: t2.micro]
    #[arg(long = "instance_type", alias = "instance-type", value_name = "TYPE")]
    pub instance_type: Option<String>,

    /// Login user on the base image [default: ec2-user]
    #[arg(long = "ssh_user", alias = "ssh-user", value_name = "USER")]
    pub ssh_user: Option<String>,

    /// Provisioning script run with bash on the instance [default: init.sh]
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Maximum ssh readiness probes [default: 30]
    #[arg(
        long = "probe_attempts",
        alias = "probe-attempts",
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub probe_attempts: Option<u32>,

    /// Seconds between ssh readiness probes, at most one day [default: 10]
    #[arg(
        long = "probe_interval",
        alias = "probe-interval",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(..=MAX_PROBE_INTERVAL_SECS)
    )]
    pub probe_interval: Option<u64>,

    /// AWS CLI profile
    #[arg(long)]
    pub profile: Option<String>,
}

/// Build the request and plan from flags, falling back to `config`.
///
/// # Errors
///
/// Returns an error if the probe budget is invalid.
pub fn resolve(args: &BakeArgs, config: &BakeConfig) -> Result<(BakeRequest, BakePlan)> {
    let request = BakeRequest {
        base_ami: args.base_ami.clone(),
        ami_name: args.ami_name.clone(),
        region: args.region.clone(),
        subnet_id: args.subnet_id.clone(),
        security_group: args.security_group.clone(),
        key_name: args.key_name.clone(),
        key_path: args.key_path.clone(),
        volume_size: args.volume_size.unwrap_or(config.volume_size),
    };
    let probe = ProbePolicy::new(
        args.probe_attempts.unwrap_or(config.probe.attempts),
        Duration::from_secs(args.probe_interval.unwrap_or(config.probe.interval_secs)),
    )?;
    let plan = BakePlan {
        instance_type: args
            .instance_type
            .clone()
            .unwrap_or_else(|| config.instance_type.clone()),
        ssh_user: args
            .ssh_user
            .clone()
            .unwrap_or_else(|| config.ssh_user.clone()),
        script: args.script.clone().unwrap_or_else(|| config.script.clone()),
        probe,
    };
    Ok((request, plan))
}

/// Entry point for a bake.
///
/// Prints the new image id (or its JSON description) to stdout.
///
/// # Errors
///
/// Returns the `BakeError` of the failed stage, converted to `anyhow`.
pub async fn run(app: &AppContext, args: &BakeArgs) -> Result<()> {
    let (request, plan) = resolve(args, &app.config)?;
    let profile = args.profile.as_deref().or(app.config.aws.profile.as_deref());
    let provider = app.provider(&request.region, profile);
    let shell = app.shell();

    let reporter = TerminalReporter::new(&app.output);
    let result = bake(&provider, &shell, &reporter, &request, &plan).await;
    drop(reporter);
    let image = result?;

    if app.is_json() {
        println!("{}", json::format_image(&image)?);
    } else {
        println!("{}", image.image_id);
    }
    Ok(())
}
