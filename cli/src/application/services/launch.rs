//! Application service: launch one instance from a registered image.

use anyhow::{Context, Result};

use crate::application::ports::{InstanceApi, InstanceRequest, ProgressReporter};
use crate::domain::config::LaunchConfig;
use crate::domain::validate::validate_image_id;

/// Request one instance booting `image_id`. Does not wait for it to run.
///
/// # Errors
///
/// Returns an error if the image id is malformed or the request is refused.
pub async fn launch_instance(
    cloud: &impl InstanceApi,
    image_id: &str,
    launch: &LaunchConfig,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    validate_image_id(image_id)?;
    reporter.step(&format!("launching {image_id} ({})...", launch.instance_type));
    let instance = cloud
        .run_instance(&InstanceRequest {
            image_id,
            instance_type: &launch.instance_type,
            key_name: None,
            security_group: &launch.security_group,
            zone: None,
        })
        .await
        .with_context(|| format!("failed to launch an instance of {image_id}"))?;
    tracing::info!(instance_id = %instance.id, image_id, "instance launched");
    reporter.success(&format!("launched instance {}", instance.id));
    Ok(instance.id)
}
