//! Build-instance teardown: idempotent termination and the guard that owns
//! the instance for the duration of a bake.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use crate::application::ports::{
    InstanceInspector, InstanceLifecycle, ProgressReporter, ProviderWaiter, Waiter,
};
use crate::domain::CleanupWarning;

/// What `ensure_terminated` found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The provider no longer knows the instance.
    AlreadyGone,
    /// The instance was already terminated; nothing was called.
    AlreadyTerminated,
    /// A terminate request was issued and confirmed.
    Terminated,
}

/// Make sure `instance_id` ends up terminated, blocking until confirmed.
///
/// Idempotent: an instance that is gone or already terminated is left alone,
/// so calling this twice issues at most one terminate request. A failed
/// describe does not stop the attempt; termination is still requested.
///
/// # Errors
///
/// Returns a `CleanupWarning` when the terminate request or the
/// termination wait fails.
pub async fn ensure_terminated(
    provider: &(impl InstanceLifecycle + InstanceInspector + ProviderWaiter),
    instance_id: &str,
) -> Result<Teardown, CleanupWarning> {
    match provider.describe(instance_id).await {
        Ok(None) => return Ok(Teardown::AlreadyGone),
        Ok(Some(desc)) if desc.state.is_terminated() => return Ok(Teardown::AlreadyTerminated),
        Ok(Some(_)) | Err(_) => {}
    }

    let warning = |e: anyhow::Error| CleanupWarning {
        instance_id: instance_id.to_string(),
        reason: format!("{e:#}"),
    };
    provider.terminate(instance_id).await.map_err(warning)?;
    provider
        .wait(Waiter::InstanceTerminated, instance_id)
        .await
        .map_err(warning)?;
    Ok(Teardown::Terminated)
}

/// Exclusive owner of a launched build instance.
///
/// Call `release()` on every exit path; it runs `ensure_terminated`. Teardown
/// is async and cannot run from `Drop`, so a guard dropped without release
/// (panic, cancelled future) only reports the leaked instance.
pub struct InstanceGuard<'a, P, R: ProgressReporter> {
    provider: &'a P,
    reporter: &'a R,
    instance_id: String,
    released: bool,
}

impl<'a, P, R> InstanceGuard<'a, P, R>
where
    P: InstanceLifecycle + InstanceInspector + ProviderWaiter,
    R: ProgressReporter,
{
    #[must_use]
    pub fn new(provider: &'a P, reporter: &'a R, instance_id: String) -> Self {
        Self {
            provider,
            reporter,
            instance_id,
            released: false,
        }
    }

    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Terminate the instance and consume the guard.
    ///
    /// # Errors
    ///
    /// Returns a `CleanupWarning` when termination could not be confirmed.
    pub async fn release(mut self) -> Result<Teardown, CleanupWarning> {
        let result = ensure_terminated(self.provider, &self.instance_id).await;
        self.released = true;
        result
    }
}

impl<P, R: ProgressReporter> Drop for InstanceGuard<'_, P, R> {
    fn drop(&mut self) {
        if !self.released {
            self.reporter.warn(&format!(
                "build instance {id} was not cleaned up and may still be running.\n\
                 Terminate it manually: aws ec2 terminate-instances --instance-ids {id}",
                id = self.instance_id
            ));
        }
    }
}
