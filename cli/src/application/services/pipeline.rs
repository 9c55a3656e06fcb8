//! Pipeline orchestrator.
//!
//! Drives one run along `Start → HostProvisioned → VolumeStaged →
//! ImageRegistered → Done`. Each edge is one component call. Any component
//! failure moves the run to `Failed` and is returned together with the ids
//! of every resource created so far; nothing is rolled back.

use std::path::PathBuf;

use amibake_common::PipelineStage;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    Clock, CloudProvider, InstanceRequest, ProgressReporter, RemoteShell,
};
use crate::application::services::build_host::provision_build_host;
use crate::application::services::poll::PollOptions;
use crate::application::services::registrar::{RegistrationPlan, register_image};
use crate::application::services::retry::RetryPolicy;
use crate::application::services::volume_stager::{StagingPlan, stage_volume};
use crate::domain::{BakeConfig, Image, PipelineError, PipelineFailure, PipelineRun};

/// Per-invocation inputs that are not part of the configuration.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub zone: String,
    pub artifact: PathBuf,
}

/// The orchestrator, with every collaborator and setting passed in
/// explicitly at construction.
pub struct Pipeline<'a, C, S, K, R> {
    cloud: &'a C,
    shell: &'a S,
    clock: &'a K,
    reporter: &'a R,
    config: BakeConfig,
    cancel: CancellationToken,
}

impl<'a, C, S, K, R> Pipeline<'a, C, S, K, R>
where
    C: CloudProvider,
    S: RemoteShell,
    K: Clock,
    R: ProgressReporter,
{
    pub fn new(
        cloud: &'a C,
        shell: &'a S,
        clock: &'a K,
        reporter: &'a R,
        config: BakeConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cloud,
            shell,
            clock,
            reporter,
            config,
            cancel,
        }
    }

    /// Run the whole pipeline with fresh resources.
    ///
    /// `run` must be new: a run is never resumed. On return its stage is
    /// `Done` or `Failed` and its resources hold every id created.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineFailure`] naming the stage being worked towards,
    /// the resources created so far, and the component error.
    pub async fn execute(
        &self,
        run: &mut PipelineRun,
        request: &BuildRequest,
    ) -> Result<Image, PipelineFailure> {
        debug_assert_eq!(run.stage(), PipelineStage::Start, "pipeline runs are not reusable");
        tracing::info!(zone = %request.zone, artifact = %request.artifact.display(), "pipeline started");

        match self.drive(run, request).await {
            Ok(image) => {
                tracing::info!(image_id = %image.id, "pipeline finished");
                Ok(image)
            }
            Err(error) => {
                let stage = run.target().unwrap_or(run.stage());
                run.fail();
                tracing::error!(
                    %stage,
                    code = error.code(),
                    error = %error,
                    instance_id = run.resources.build_host_id.as_deref().unwrap_or("-"),
                    volume_id = run.resources.volume_id.as_deref().unwrap_or("-"),
                    snapshot_id = run.resources.snapshot_id.as_deref().unwrap_or("-"),
                    "pipeline failed"
                );
                Err(PipelineFailure {
                    stage,
                    resources: run.resources.clone(),
                    error,
                })
            }
        }
    }

    async fn drive(
        &self,
        run: &mut PipelineRun,
        request: &BuildRequest,
    ) -> Result<Image, PipelineError> {
        let cfg = &self.config;
        let retry = RetryPolicy::from(&cfg.retry);
        let wait = |timeout_secs| PollOptions::from_config(&cfg.polling, timeout_secs, retry);

        // Start → HostProvisioned
        let host = provision_build_host(
            self.cloud,
            &InstanceRequest {
                image_id: &cfg.build_host.image_id,
                instance_type: &cfg.build_host.instance_type,
                key_name: Some(&cfg.build_host.key_name),
                security_group: &cfg.build_host.security_group,
                zone: Some(&request.zone),
            },
            &wait(cfg.polling.instance_timeout_secs),
            &self.cancel,
            &mut run.resources,
            self.reporter,
        )
        .await?;
        run.build_host = Some(host.clone());
        self.enter(run);

        // HostProvisioned → VolumeStaged
        let volume = stage_volume(
            self.cloud,
            self.shell,
            &host,
            &StagingPlan {
                size_gib: cfg.volume.size_gib,
                zone: &request.zone,
                device: &cfg.volume.device,
                mount_point: &cfg.volume.mount_point,
                artifact: &request.artifact,
                volume_wait: wait(cfg.polling.volume_timeout_secs),
                attachment_wait: wait(cfg.polling.attachment_timeout_secs),
                device_wait: cfg.volume.device_wait,
                settle_wait: wait(cfg.volume.settle_secs),
            },
            &self.cancel,
            &mut run.resources,
            self.reporter,
        )
        .await?;
        run.volume = Some(volume.clone());
        self.enter(run);

        // VolumeStaged → ImageRegistered
        let (snapshot, image) = register_image(
            self.cloud,
            self.clock,
            &volume,
            &RegistrationPlan {
                name_prefix: &cfg.image.name_prefix,
                kernel_id: &cfg.image.kernel_id,
                architecture: &cfg.image.architecture,
                root_device: &cfg.volume.device,
                snapshot_wait: wait(cfg.polling.snapshot_timeout_secs),
                retry,
            },
            &self.cancel,
            &mut run.resources,
            self.reporter,
        )
        .await?;
        run.snapshot = Some(snapshot);
        run.image = Some(image.clone());
        self.enter(run);

        // ImageRegistered → Done
        self.enter(run);
        Ok(image)
    }

    fn enter(&self, run: &mut PipelineRun) {
        if let Some(stage) = run.advance() {
            tracing::info!(%stage, "stage reached");
        }
    }
}
