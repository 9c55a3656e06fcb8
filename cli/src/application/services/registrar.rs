//! Snapshot & image registrar: snapshot the staged volume, then register a
//! bootable image backed by the completed snapshot.

use amibake_common::ResourceIds;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Clock, ImageApi, ImageRequest, ProgressReporter, SnapshotApi};
use crate::application::services::poll::{PollOptions, Readiness, await_state};
use crate::application::services::retry::{RetryError, RetryPolicy, retry_transient};
use crate::domain::{Image, PipelineError, Snapshot, SnapshotStatus, Volume};

/// Image naming, boot parameters, and waits for one registration.
#[derive(Debug, Clone)]
pub struct RegistrationPlan<'a> {
    pub name_prefix: &'a str,
    /// Boot-loader kernel the image boots through.
    pub kernel_id: &'a str,
    pub architecture: &'a str,
    /// Device the snapshot is mapped to; must match the staged device.
    pub root_device: &'a str,
    pub snapshot_wait: PollOptions,
    pub retry: RetryPolicy,
}

/// Image name: `<prefix>-<YYYYmmddHHMM>` in UTC.
///
/// Names are coarse to the minute: two registrations with the same prefix
/// in the same minute collide.
#[must_use]
pub fn image_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}", now.format("%Y%m%d%H%M"))
}

/// Snapshot `volume` and register an image from it. Returns the completed
/// snapshot and the registered image.
///
/// The volume must already be unmounted. Registration is only requested
/// once the snapshot has been observed as `Completed`.
///
/// # Errors
///
/// - `Registration` if the snapshot request or the registration is refused,
///   or registration keeps failing transiently.
/// - `FatalProvider` if the snapshot enters the error state.
/// - `Timeout`, `TransientProvider`, or `Cancelled` from the snapshot wait.
pub async fn register_image<C>(
    cloud: &C,
    clock: &impl Clock,
    volume: &Volume,
    plan: &RegistrationPlan<'_>,
    cancel: &CancellationToken,
    resources: &mut ResourceIds,
    reporter: &impl ProgressReporter,
) -> Result<(Snapshot, Image), PipelineError>
where
    C: SnapshotApi + ImageApi,
{
    reporter.step(&format!("snapshotting volume {}...", volume.id));
    let requested =
        cloud
            .create_snapshot(&volume.id)
            .await
            .map_err(|err| PipelineError::Registration {
                reason: format!("snapshot of volume {} refused: {err}", volume.id),
            })?;
    resources.snapshot_id = Some(requested.id.clone());
    tracing::info!(snapshot_id = %requested.id, volume_id = %volume.id, "snapshot requested");

    let snapshot = await_state(
        &format!("snapshot {} to complete", requested.id),
        &plan.snapshot_wait,
        cancel,
        || cloud.describe_snapshot(&requested.id),
        snapshot_completed,
    )
    .await?;
    tracing::info!(snapshot_id = %snapshot.id, "snapshot completed");

    let name = image_name(plan.name_prefix, clock.now());
    let request = ImageRequest {
        name: &name,
        snapshot_id: &snapshot.id,
        kernel_id: plan.kernel_id,
        architecture: plan.architecture,
        root_device: plan.root_device,
    };
    reporter.step(&format!("registering image {name}..."));
    let image = retry_transient(&plan.retry, cancel, || cloud.register_image(&request))
        .await
        .map_err(|err| match err {
            RetryError::Cancelled => PipelineError::Cancelled,
            RetryError::Exhausted { attempts, last } => PipelineError::Registration {
                reason: format!("still failing after {attempts} attempts: {last}"),
            },
            RetryError::Failed(source) => PipelineError::Registration {
                reason: source.to_string(),
            },
        })?;

    resources.image_id = Some(image.id.clone());
    tracing::info!(image_id = %image.id, image_name = %image.name, "image registered");
    reporter.success(&format!("registered image {} ({})", image.id, image.name));
    Ok((snapshot, image))
}

fn snapshot_completed(snapshot: &Snapshot) -> Readiness {
    match snapshot.status {
        SnapshotStatus::Completed => Readiness::Ready,
        SnapshotStatus::Pending => Readiness::Pending,
        SnapshotStatus::Error => {
            Readiness::Failed(format!("snapshot {} entered the error state", snapshot.id))
        }
    }
}
