//! Volume stager: create and attach the boot volume, then lay out the
//! filesystem, bootloader menu, and compressed kernel on it over the remote
//! shell.
//!
//! Each step is a precondition for the next. In particular nothing is
//! formatted or mounted before the attachment has been observed as
//! `Attached`, and the volume is unmounted before returning.

use std::path::Path;
use std::process::Output;

use amibake_common::ResourceIds;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ProgressReporter, RemoteShell, VolumeApi};
use crate::application::services::poll::{PollOptions, Readiness, await_state};
use crate::domain::staging::{
    GRUB_DIR, KERNEL_PATH, device_aliases, grub_menu, remote_upload_path, shell_quote,
};
use crate::domain::{
    AttachmentState, BuildHost, DeviceWait, PipelineError, ProviderError, ResourceKind,
    StagingStep, Volume, VolumeState,
};

/// What to stage and how long each wait may take.
#[derive(Debug, Clone)]
pub struct StagingPlan<'a> {
    pub size_gib: u32,
    pub zone: &'a str,
    /// Device path requested at attach time.
    pub device: &'a str,
    pub mount_point: &'a str,
    /// Local unikernel image to install as the kernel.
    pub artifact: &'a Path,
    pub volume_wait: PollOptions,
    pub attachment_wait: PollOptions,
    pub device_wait: DeviceWait,
    /// Deadline (and, for `DeviceWait::Fixed`, duration) of the device wait.
    pub settle_wait: PollOptions,
}

/// Create, attach, and populate the boot volume on `host`.
///
/// On success the volume is attached to `host` and unmounted. The volume id
/// is recorded in `resources` as soon as it exists.
///
/// # Errors
///
/// - `Provision` if the volume cannot be created.
/// - `Staging` if the attach request is refused or a remote command fails;
///   carries the step and the remote exit code.
/// - `Timeout`, `TransientProvider`, `FatalProvider`, or `Cancelled` from
///   the waits.
pub async fn stage_volume(
    cloud: &impl VolumeApi,
    shell: &impl RemoteShell,
    host: &BuildHost,
    plan: &StagingPlan<'_>,
    cancel: &CancellationToken,
    resources: &mut ResourceIds,
    reporter: &impl ProgressReporter,
) -> Result<Volume, PipelineError> {
    let address = host
        .public_address
        .as_deref()
        .ok_or_else(|| PipelineError::FatalProvider {
            what: format!("build host {}", host.id),
            reason: "no public address assigned".to_string(),
        })?;

    // ── Create ────────────────────────────────────────────────────────────────
    reporter.step(&format!(
        "creating {} GiB volume in {}...",
        plan.size_gib, plan.zone
    ));
    let created = cloud
        .create_volume(plan.size_gib, plan.zone)
        .await
        .map_err(|source| PipelineError::Provision {
            resource: ResourceKind::Volume,
            source,
        })?;
    resources.volume_id = Some(created.id.clone());
    tracing::info!(volume_id = %created.id, zone = plan.zone, "volume created");

    await_state(
        &format!("volume {} to become available", created.id),
        &plan.volume_wait,
        cancel,
        || cloud.describe_volume(&created.id),
        volume_available,
    )
    .await?;

    // ── Attach ────────────────────────────────────────────────────────────────
    reporter.step(&format!(
        "attaching volume {} to {} at {}...",
        created.id, host.id, plan.device
    ));
    cloud
        .attach_volume(&created.id, &host.id, plan.device)
        .await
        .map_err(|err: ProviderError| PipelineError::Staging {
            step: StagingStep::Attach,
            exit_code: None,
            message: err.to_string(),
        })?;
    let volume = await_state(
        &format!("volume {} to attach", created.id),
        &plan.attachment_wait,
        cancel,
        || cloud.describe_volume(&created.id),
        volume_attached,
    )
    .await?;
    tracing::info!(volume_id = %volume.id, instance_id = %host.id, device = plan.device, "volume attached");

    let device = settle_device(shell, address, plan, cancel).await?;
    tracing::debug!(%device, "device node present");

    // ── Populate ──────────────────────────────────────────────────────────────
    let mount = plan.mount_point.trim_end_matches('/');
    let dev_q = shell_quote(&device);
    let mount_q = shell_quote(mount);
    let grub_dir = format!("{mount}/{GRUB_DIR}");
    let file_name = plan
        .artifact
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PipelineError::Staging {
            step: StagingStep::UploadArtifact,
            exit_code: None,
            message: format!("artifact path {} has no file name", plan.artifact.display()),
        })?;
    let uploaded = remote_upload_path(file_name);

    reporter.step(&format!("formatting {device} on {address}..."));
    let steps = [
        (
            StagingStep::Format,
            Remote::Privileged(format!("mkfs.ext2 {dev_q}")),
        ),
        (
            StagingStep::Mount,
            Remote::Privileged(format!("mount -t ext2 {dev_q} {mount_q}")),
        ),
        (
            StagingStep::BootloaderDir,
            Remote::Privileged(format!("mkdir -p {}", shell_quote(&grub_dir))),
        ),
        (
            StagingStep::BootloaderMenu,
            Remote::Plain(format!("printf '%s' {} > menu.lst", shell_quote(&grub_menu()))),
        ),
        (
            StagingStep::BootloaderMenu,
            Remote::Privileged(format!(
                "mv menu.lst {}",
                shell_quote(&format!("{grub_dir}/menu.lst"))
            )),
        ),
        (
            StagingStep::UploadArtifact,
            Remote::Upload(plan.artifact, uploaded.clone()),
        ),
        (
            StagingStep::CompressArtifact,
            Remote::Privileged(format!(
                "gzip -c {} > {}",
                shell_quote(&uploaded),
                shell_quote(&format!("{mount}{KERNEL_PATH}"))
            )),
        ),
        (
            StagingStep::Unmount,
            Remote::Privileged(format!("umount -d {mount_q}")),
        ),
    ];
    for (step, remote) in &steps {
        if *step == StagingStep::UploadArtifact {
            reporter.step(&format!("copying {file_name} to the build host..."));
        }
        remote_step(shell, address, *step, remote, cancel).await?;
    }

    reporter.success(&format!("volume {} staged", volume.id));
    Ok(volume)
}

fn volume_available(volume: &Volume) -> Readiness {
    match volume.state {
        VolumeState::Available => Readiness::Ready,
        VolumeState::Creating => Readiness::Pending,
        VolumeState::InUse | VolumeState::Deleted | VolumeState::Error => {
            Readiness::Failed(format!("volume {} is {:?}", volume.id, volume.state))
        }
    }
}

fn volume_attached(volume: &Volume) -> Readiness {
    match (volume.state, volume.attachment) {
        (VolumeState::Deleted | VolumeState::Error, _) => {
            Readiness::Failed(format!("volume {} is {:?}", volume.id, volume.state))
        }
        (_, AttachmentState::Attached) => Readiness::Ready,
        _ => Readiness::Pending,
    }
}

/// Shell snippet printing the first existing block device among `names`.
fn device_probe_command(names: &[String]) -> String {
    let list = names
        .iter()
        .map(|n| shell_quote(n))
        .collect::<Vec<_>>()
        .join(" ");
    format!("for d in {list}; do if [ -b \"$d\" ]; then echo \"$d\"; exit 0; fi; done; exit 1")
}

/// Wait until the attached device node exists in the guest and return its
/// name there.
async fn settle_device(
    shell: &impl RemoteShell,
    address: &str,
    plan: &StagingPlan<'_>,
    cancel: &CancellationToken,
) -> Result<String, PipelineError> {
    match plan.device_wait {
        DeviceWait::Fixed => {
            tracing::debug!(secs = plan.settle_wait.timeout.as_secs(), "fixed device settle");
            tokio::select! {
                () = cancel.cancelled() => return Err(PipelineError::Cancelled),
                () = tokio::time::sleep(plan.settle_wait.timeout) => {}
            }
            Ok(plan.device.to_string())
        }
        DeviceWait::Poll => {
            let command = device_probe_command(&device_aliases(plan.device));
            let probe = command.as_str();
            let found = await_state(
                &format!("device {} to appear", plan.device),
                &plan.settle_wait,
                cancel,
                || async move {
                    Ok::<_, ProviderError>(
                        shell
                            .run(address, probe)
                            .await
                            .map_err(|e| format!("{e:#}")),
                    )
                },
                |outcome: &Result<Output, String>| match outcome {
                    Ok(out) if out.status.success() => Readiness::Ready,
                    Ok(_) => Readiness::Pending,
                    Err(reason) => Readiness::Failed(reason.clone()),
                },
            )
            .await
            .map_err(|err| match err {
                PipelineError::FatalProvider { reason, .. } => PipelineError::Staging {
                    step: StagingStep::DeviceSettle,
                    exit_code: None,
                    message: reason,
                },
                other => other,
            })?;
            let name = found
                .ok()
                .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| plan.device.to_string());
            Ok(name)
        }
    }
}

/// One remote invocation on the build host.
#[derive(Debug)]
enum Remote<'a> {
    Plain(String),
    Privileged(String),
    Upload(&'a Path, String),
}

/// Run one staging command. A non-zero exit is a `Staging` error for `step`.
/// The local process is dropped (and killed) if `cancel` fires mid-command.
async fn remote_step(
    shell: &impl RemoteShell,
    address: &str,
    step: StagingStep,
    remote: &Remote<'_>,
    cancel: &CancellationToken,
) -> Result<Output, PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    tracing::debug!(%step, ?remote, "remote step");
    let call = async {
        match remote {
            Remote::Plain(command) => shell.run(address, command).await,
            Remote::Privileged(command) => shell.run_privileged(address, command).await,
            Remote::Upload(local, target) => shell.upload(address, local, target).await,
        }
    };
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(PipelineError::Cancelled),
        result = call => result,
    };
    let output = result.map_err(|e| PipelineError::Staging {
        step,
        exit_code: None,
        message: format!("{e:#}"),
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(%step, code = ?output.status.code(), %stderr, "remote step failed");
        return Err(PipelineError::Staging {
            step,
            exit_code: output.status.code(),
            message: if stderr.is_empty() {
                "command failed".to_string()
            } else {
                stderr
            },
        });
    }
    Ok(output)
}
