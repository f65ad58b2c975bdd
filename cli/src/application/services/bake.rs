//! Application service for the image bake use-case.
//!
//! Drives one build instance from launch to image and guarantees its
//! termination on every path once it exists. All I/O except the local
//! preflight is routed through injected port traits.

use std::path::Path;

use chrono::{SecondsFormat, Utc};

use crate::application::ports::{
    ImageProvider, ImageSpec, LaunchSpec, ProgressReporter, RemoteShell, ShellTarget, Waiter,
};
use crate::application::services::cleanup::{InstanceGuard, Teardown};
use crate::application::services::probe::wait_for_ssh;
use crate::domain::{
    BakeError, BakePlan, BakeRequest, BakeStage, BakedImage, UnconfirmedLaunch,
    build_instance_name,
};

/// Lines of remote stderr kept in a provisioning-script error.
const STDERR_TAIL_LINES: usize = 20;

/// Bake one image.
///
/// Walks INIT → PROVISIONING → AWAIT_RUNNING → AWAIT_HEALTHY → AWAIT_SSH →
/// PROVISION_SCRIPT → STOPPING → SNAPSHOT → CLEANUP → DONE. Once the
/// instance is launched, CLEANUP runs whatever happens next, and a cleanup
/// failure is reported as a warning without replacing the bake outcome.
///
/// # Errors
///
/// Returns the `BakeError` of the first stage that failed.
pub async fn bake(
    provider: &impl ImageProvider,
    shell: &impl RemoteShell,
    reporter: &impl ProgressReporter,
    request: &BakeRequest,
    plan: &BakePlan,
) -> Result<BakedImage, BakeError> {
    reporter.step(BakeStage::Init.progress_message());
    let script = preflight(request, plan)?;

    reporter.step(BakeStage::Provisioning.progress_message());
    let name_tag = build_instance_name(&request.ami_name);
    let instance_id = provider
        .launch(&LaunchSpec {
            image_id: &request.base_ami,
            instance_type: &plan.instance_type,
            key_name: &request.key_name,
            subnet_id: &request.subnet_id,
            security_group: &request.security_group,
            volume_size: request.volume_size,
            name_tag: &name_tag,
        })
        .await
        .map_err(|e| {
            if let Some(unconfirmed) = e.downcast_ref::<UnconfirmedLaunch>() {
                reporter.warn(&unconfirmed.to_string());
            }
            BakeError::Provision {
                stage: BakeStage::Provisioning,
                reason: format!("{e:#}"),
            }
        })?;
    reporter.success(&format!("launched {instance_id}"));

    let guard = InstanceGuard::new(provider, reporter, instance_id);
    let mut run = BakeRun {
        provider,
        shell,
        reporter,
        request,
        plan,
        instance_id: guard.instance_id(),
        stage: BakeStage::Provisioning,
    };
    let outcome = run.drive(&script).await;
    let failed_at = run.stage;

    if outcome.is_err() && failed_at.owns_instance() {
        reporter.warn(&format!("{failed_at} failed, cleaning up"));
    }
    reporter.step(BakeStage::Cleanup.progress_message());
    match guard.release().await {
        Ok(Teardown::Terminated) => reporter.success("build instance terminated"),
        Ok(Teardown::AlreadyTerminated | Teardown::AlreadyGone) => {
            reporter.success("build instance already gone");
        }
        Err(warning) => reporter.warn(&warning.to_string()),
    }

    if let Ok(image) = &outcome {
        reporter.success(&format!("image {} ({}) available", image.image_id, image.name));
    }
    outcome
}

/// INIT: check everything that can be checked before spending money.
///
/// Returns the provisioning script's bytes.
fn preflight(request: &BakeRequest, plan: &BakePlan) -> Result<Vec<u8>, BakeError> {
    request.validate()?;
    check_key_file(&request.key_path)?;
    std::fs::read(&plan.script).map_err(|e| {
        BakeError::Precondition(format!(
            "cannot read provisioning script '{}': {e}",
            plan.script.display()
        ))
    })
}

fn check_key_file(path: &Path) -> Result<(), BakeError> {
    let meta = std::fs::metadata(path).map_err(|_| {
        BakeError::Precondition(format!(
            "The private key file '{}' does not exist.",
            path.display()
        ))
    })?;
    if !meta.is_file() {
        return Err(BakeError::Precondition(format!(
            "The private key path '{}' is not a file.",
            path.display()
        )));
    }
    std::fs::File::open(path).map_err(|e| {
        BakeError::Precondition(format!(
            "The private key file '{}' is not readable: {e}",
            path.display()
        ))
    })?;
    Ok(())
}

/// State carried through the stages that own the instance.
struct BakeRun<'a, P, S, R> {
    provider: &'a P,
    shell: &'a S,
    reporter: &'a R,
    request: &'a BakeRequest,
    plan: &'a BakePlan,
    instance_id: &'a str,
    stage: BakeStage,
}

impl<P, S, R> BakeRun<'_, P, S, R>
where
    P: ImageProvider,
    S: RemoteShell,
    R: ProgressReporter,
{
    fn enter(&mut self, stage: BakeStage) {
        self.stage = stage;
        self.reporter.step(stage.progress_message());
    }

    async fn drive(&mut self, script: &[u8]) -> Result<BakedImage, BakeError> {
        self.enter(BakeStage::AwaitRunning);
        self.wait_instance(Waiter::InstanceRunning).await?;

        self.enter(BakeStage::AwaitHealthy);
        self.wait_instance(Waiter::InstanceStatusOk).await?;
        let address = self.private_address().await?;
        self.reporter
            .success(&format!("instance healthy at private IP {address}"));

        self.enter(BakeStage::AwaitSsh);
        let (plan, request) = (self.plan, self.request);
        let target = ShellTarget {
            address: &address,
            user: &plan.ssh_user,
            key_path: &request.key_path,
        };
        let attempts = wait_for_ssh(self.shell, &target, plan.probe, self.reporter).await?;
        self.reporter
            .success(&format!("ssh reachable after {attempts} attempt(s)"));

        self.enter(BakeStage::ProvisionScript);
        self.run_script(&target, script).await?;
        self.reporter.success("provisioning script finished");

        self.enter(BakeStage::Stopping);
        self.provider
            .stop(self.instance_id)
            .await
            .map_err(|e| self.provision_error(&e))?;
        self.wait_instance(Waiter::InstanceStopped).await?;

        self.enter(BakeStage::Snapshot);
        let image_id = self.snapshot().await?;

        Ok(BakedImage {
            image_id,
            name: self.request.ami_name.clone(),
            instance_id: self.instance_id.to_string(),
        })
    }

    async fn wait_instance(&self, waiter: Waiter) -> Result<(), BakeError> {
        self.provider
            .wait(waiter, self.instance_id)
            .await
            .map_err(|e| BakeError::ProvisionTimeout {
                instance_id: self.instance_id.to_string(),
                waiter: waiter.to_string(),
                reason: format!("{e:#}"),
            })
    }

    async fn private_address(&self) -> Result<String, BakeError> {
        let desc = self
            .provider
            .describe(self.instance_id)
            .await
            .map_err(|e| self.provision_error(&e))?
            .ok_or_else(|| {
                self.provision_error(&anyhow::anyhow!(
                    "instance {} disappeared",
                    self.instance_id
                ))
            })?;
        desc.private_ip.ok_or_else(|| {
            self.provision_error(&anyhow::anyhow!(
                "instance {} has no private IPv4 address",
                self.instance_id
            ))
        })
    }

    async fn run_script(&self, target: &ShellTarget<'_>, script: &[u8]) -> Result<(), BakeError> {
        let output = self
            .shell
            .run_script(target, script)
            .await
            .map_err(|e| BakeError::ProvisioningScript {
                instance_id: self.instance_id.to_string(),
                exit_code: None,
                stderr: format!("{e:#}"),
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(BakeError::ProvisioningScript {
            instance_id: self.instance_id.to_string(),
            exit_code: output.status.code(),
            stderr: tail_lines(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES),
        })
    }

    async fn snapshot(&self) -> Result<String, BakeError> {
        let description = format!(
            "Baked from {} at {}",
            self.request.base_ami,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let image_id = self
            .provider
            .create_image(&ImageSpec {
                instance_id: self.instance_id,
                name: &self.request.ami_name,
                description: &description,
                no_reboot: true,
            })
            .await
            .map_err(|e| BakeError::Snapshot {
                instance_id: self.instance_id.to_string(),
                image_id: None,
                reason: format!("{e:#}"),
            })?;

        self.reporter
            .step(&format!("waiting for image {image_id} to become available..."));
        self.provider
            .wait(Waiter::ImageAvailable, &image_id)
            .await
            .map_err(|e| BakeError::Snapshot {
                instance_id: self.instance_id.to_string(),
                image_id: Some(image_id.clone()),
                reason: format!("{e:#}"),
            })?;
        Ok(image_id)
    }

    fn provision_error(&self, e: &anyhow::Error) -> BakeError {
        BakeError::Provision {
            stage: self.stage,
            reason: format!("{e:#}"),
        }
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
