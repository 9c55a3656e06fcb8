//! Build-host provisioner: launch one instance and wait until it is
//! reachable.

use amibake_common::ResourceIds;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{InstanceApi, InstanceRequest, ProgressReporter};
use crate::application::services::poll::{PollOptions, Readiness, await_state};
use crate::domain::{BuildHost, InstanceState, PipelineError, ResourceKind};

/// Launch the build host and wait until it is running with an address.
///
/// The instance id is recorded in `resources` as soon as the provider
/// assigns it, so it is reported even if the wait fails.
///
/// # Errors
///
/// - `Provision` if the launch request is refused.
/// - Any `await_state` error while waiting; a host that stops or
///   terminates is `FatalProvider`.
pub async fn provision_build_host(
    cloud: &impl InstanceApi,
    request: &InstanceRequest<'_>,
    poll: &PollOptions,
    cancel: &CancellationToken,
    resources: &mut ResourceIds,
    reporter: &impl ProgressReporter,
) -> Result<BuildHost, PipelineError> {
    reporter.step(&format!(
        "launching build host ({} from {})...",
        request.instance_type, request.image_id
    ));
    let launched = cloud
        .run_instance(request)
        .await
        .map_err(|source| PipelineError::Provision {
            resource: ResourceKind::BuildHost,
            source,
        })?;
    resources.build_host_id = Some(launched.id.clone());
    tracing::info!(instance_id = %launched.id, "build host launched");

    reporter.step(&format!("waiting for build host {} to start...", launched.id));
    let host = await_state(
        &format!("build host {} to be running", launched.id),
        poll,
        cancel,
        || cloud.describe_instance(&launched.id),
        host_readiness,
    )
    .await?;

    resources.build_host_address.clone_from(&host.public_address);
    tracing::info!(
        instance_id = %host.id,
        address = host.public_address.as_deref().unwrap_or_default(),
        "build host running"
    );
    reporter.success(&format!(
        "build host {} running at {}",
        host.id,
        host.public_address.as_deref().unwrap_or_default()
    ));
    Ok(host)
}

fn host_readiness(host: &BuildHost) -> Readiness {
    match host.state {
        InstanceState::Running if host.is_reachable() => Readiness::Ready,
        InstanceState::Running | InstanceState::Pending => Readiness::Pending,
        InstanceState::Stopped => Readiness::Failed(format!("build host {} stopped", host.id)),
        InstanceState::Terminated => {
            Readiness::Failed(format!("build host {} terminated", host.id))
        }
    }
}
