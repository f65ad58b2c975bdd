//! Infrastructure implementation of the provider port traits.
//!
//! `AwsCliProvider<R>` routes every EC2 call through the `aws` CLI (v2) via a
//! `CommandRunner`, parsing its `--output json` replies.

use std::process::Output;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::application::ports::{
    CommandRunner, ImageCapture, ImageSpec, InstanceInspector, InstanceLifecycle, LaunchSpec,
    ProviderWaiter, Waiter,
};
use crate::domain::{InstanceDescription, InstanceState, UnconfirmedLaunch};

/// Error code the EC2 API returns for an unknown instance id.
const INSTANCE_NOT_FOUND: &str = "InvalidInstanceID.NotFound";

static INSTANCE_ID_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""InstanceId"\s*:\s*"(i-[0-9a-f]+)""#).unwrap_or_else(|e| unreachable!("{e}"))
});

// ── Response shapes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeImages {
    #[serde(default)]
    images: Vec<ImageRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageRecord {
    root_device_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstances {
    #[serde(default)]
    instances: Vec<InstanceRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<InstanceRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceRecord {
    instance_id: String,
    state: Option<StateRecord>,
    private_ip_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StateRecord {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateImage {
    image_id: String,
}

// ── Adapter ──────────────────────────────────────────────────────────────────

/// Provider adapter that drives the `aws` CLI.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct AwsCliProvider<R: CommandRunner> {
    runner: R,
    region: String,
    profile: Option<String>,
    wait_timeout: Duration,
}

impl<R: CommandRunner> AwsCliProvider<R> {
    /// `wait_timeout` bounds each `aws ec2 wait` call; every other call uses
    /// the runner's own timeout.
    pub fn new(runner: R, region: &str, profile: Option<&str>, wait_timeout: Duration) -> Self {
        Self {
            runner,
            region: region.to_string(),
            profile: profile.map(str::to_string),
            wait_timeout,
        }
    }

    /// The underlying runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn full_args<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        let mut full = Vec::with_capacity(args.len() + 7);
        full.push("ec2");
        full.extend_from_slice(args);
        full.extend(["--region", self.region.as_str()]);
        if let Some(profile) = &self.profile {
            full.extend(["--profile", profile.as_str()]);
        }
        full.extend(["--output", "json"]);
        full
    }

    /// Run `aws ec2 <args>` and return stdout, failing on a non-zero exit.
    async fn ec2(&self, what: &str, args: &[&str]) -> Result<Vec<u8>> {
        let output = self
            .runner
            .run("aws", &self.full_args(args))
            .await
            .with_context(|| format!("aws ec2 {what}"))?;
        check(what, output)
    }

    async fn parse<T: for<'de> Deserialize<'de>>(&self, what: &str, args: &[&str]) -> Result<T> {
        let stdout = self.ec2(what, args).await?;
        serde_json::from_slice(&stdout).with_context(|| format!("unexpected {what} response"))
    }

    /// Root device name of `image_id`, needed to size the root volume.
    async fn root_device(&self, image_id: &str) -> Result<String> {
        let reply: DescribeImages = self
            .parse("describe-images", &["describe-images", "--image-ids", image_id])
            .await?;
        reply
            .images
            .into_iter()
            .next()
            .with_context(|| format!("base image {image_id} not found"))?
            .root_device_name
            .with_context(|| format!("base image {image_id} has no root device"))
    }
}

/// Instance id from a successful `run-instances` reply. Falls back to
/// scanning the raw text when the reply is not the expected JSON.
fn instance_id_from_reply(stdout: &[u8]) -> Result<String, String> {
    let reason = match serde_json::from_slice::<RunInstances>(stdout) {
        Ok(reply) => match reply.instances.into_iter().next() {
            Some(instance) => return Ok(instance.instance_id),
            None => "reply listed no instances".to_string(),
        },
        Err(e) => format!("unreadable reply: {e}"),
    };
    INSTANCE_ID_FIELD
        .captures(&String::from_utf8_lossy(stdout))
        .map(|c| c[1].to_string())
        .ok_or(reason)
}

fn check(what: &str, output: Output) -> Result<Vec<u8>> {
    if output.status.success() {
        return Ok(output.stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("aws ec2 {what} failed: {}", stderr.trim())
}

impl<R: CommandRunner> InstanceLifecycle for AwsCliProvider<R> {
    async fn launch(&self, spec: &LaunchSpec<'_>) -> Result<String> {
        let root_device = self.root_device(spec.image_id).await?;

        let network = json!([{
            "DeviceIndex": 0,
            "SubnetId": spec.subnet_id,
            "Groups": [spec.security_group],
            "AssociatePublicIpAddress": false,
            "DeleteOnTermination": true,
        }])
        .to_string();
        let block_devices = json!([{
            "DeviceName": root_device,
            "Ebs": {
                "VolumeSize": spec.volume_size,
                "VolumeType": "gp3",
                "DeleteOnTermination": true,
            },
        }])
        .to_string();
        let tags = json!([{
            "ResourceType": "instance",
            "Tags": [{ "Key": "Name", "Value": spec.name_tag }],
        }])
        .to_string();

        let stdout = self
            .ec2(
                "run-instances",
                &[
                    "run-instances",
                    "--image-id",
                    spec.image_id,
                    "--instance-type",
                    spec.instance_type,
                    "--key-name",
                    spec.key_name,
                    "--count",
                    "1",
                    "--network-interfaces",
                    &network,
                    "--block-device-mappings",
                    &block_devices,
                    "--tag-specifications",
                    &tags,
                ],
            )
            .await?;
        instance_id_from_reply(&stdout).map_err(|reason| {
            UnconfirmedLaunch {
                name_tag: spec.name_tag.to_string(),
                reason,
            }
            .into()
        })
    }

    async fn stop(&self, instance_id: &str) -> Result<()> {
        self.ec2(
            "stop-instances",
            &["stop-instances", "--instance-ids", instance_id],
        )
        .await
        .map(drop)
    }

    async fn terminate(&self, instance_id: &str) -> Result<()> {
        self.ec2(
            "terminate-instances",
            &["terminate-instances", "--instance-ids", instance_id],
        )
        .await
        .map(drop)
    }
}

impl<R: CommandRunner> InstanceInspector for AwsCliProvider<R> {
    async fn describe(&self, instance_id: &str) -> Result<Option<InstanceDescription>> {
        let output = self
            .runner
            .run(
                "aws",
                &self.full_args(&["describe-instances", "--instance-ids", instance_id]),
            )
            .await
            .context("aws ec2 describe-instances")?;
        if !output.status.success()
            && String::from_utf8_lossy(&output.stderr).contains(INSTANCE_NOT_FOUND)
        {
            return Ok(None);
        }
        let stdout = check("describe-instances", output)?;
        let reply: DescribeInstances = serde_json::from_slice(&stdout)
            .context("unexpected describe-instances response")?;

        Ok(reply
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .find(|i| i.instance_id == instance_id)
            .map(|i| InstanceDescription {
                state: i
                    .state
                    .map_or(InstanceState::Unknown, |s| InstanceState::from_provider(&s.name)),
                instance_id: i.instance_id,
                private_ip: i.private_ip_address,
            }))
    }
}

impl<R: CommandRunner> ImageCapture for AwsCliProvider<R> {
    async fn create_image(&self, spec: &ImageSpec<'_>) -> Result<String> {
        let mut args = vec![
            "create-image",
            "--instance-id",
            spec.instance_id,
            "--name",
            spec.name,
            "--description",
            spec.description,
        ];
        if spec.no_reboot {
            args.push("--no-reboot");
        }
        let reply: CreateImage = self.parse("create-image", &args).await?;
        Ok(reply.image_id)
    }
}

impl<R: CommandRunner> ProviderWaiter for AwsCliProvider<R> {
    async fn wait(&self, waiter: Waiter, resource_id: &str) -> Result<()> {
        let id_flag = match waiter {
            Waiter::ImageAvailable => "--image-ids",
            Waiter::InstanceRunning
            | Waiter::InstanceStatusOk
            | Waiter::InstanceStopped
            | Waiter::InstanceTerminated => "--instance-ids",
        };
        let args = self.full_args(&["wait", waiter.name(), id_flag, resource_id]);
        let output = self
            .runner
            .run_with_timeout("aws", &args, self.wait_timeout)
            .await
            .with_context(|| format!("aws ec2 wait {waiter}"))?;
        check(&format!("wait {waiter}"), output).map(drop)
    }
}
