//! `amibake build`: bake an artifact into a registered machine image.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use amibake_common::BuildReport;
use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::app::AppContext;
use crate::application::ports::{Clock, FileHasher, ProgressReporter};
use crate::application::services::config_service;
use crate::application::services::pipeline::{BuildRequest, Pipeline};
use crate::commands::compile::{self, TargetArg};
use crate::commands::CloudArgs;
use crate::domain::validate::validate_zone;
use crate::domain::{BakeConfig, PipelineRun};
use crate::infra::fs::{LocalFs, SystemClock};
use crate::infra::mirage::MirageBuilder;
use crate::infra::ssh::{SshSettings, SshShell, expand_home};

/// Seconds `ssh` waits for each TCP connection to the build host.
const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Arguments for the build command.
#[derive(Args)]
pub struct BuildArgs {
    /// Compiled unikernel image to bake
    #[arg(long)]
    pub artifact: PathBuf,

    /// Availability zone for the build volume (must be in --region)
    #[arg(long, default_value = "eu-west-1b")]
    pub zone: String,

    /// Compile this source directory before baking
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Backend to compile for when --source-dir is given
    #[arg(long, value_enum, default_value_t)]
    pub target: TargetArg,

    #[command(flatten)]
    pub cloud: CloudArgs,
}

/// Run `amibake build`.
///
/// # Errors
///
/// Returns an error if a pre-flight check fails. A pipeline failure is
/// rendered here and reported through the exit code instead.
pub async fn run(app: &AppContext, args: BuildArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let cloud = args.cloud.client()?;
    validate_zone(&args.cloud.region, &args.zone)?;
    let reporter = app.reporter();

    if let Some(source_dir) = &args.source_dir {
        compile::compile(
            &MirageBuilder::default_runner(),
            source_dir,
            args.target.into(),
            &reporter,
        )
        .await?;
    }
    let digest = check_artifact(&LocalFs, &args.artifact)?;
    reporter.step(&format!(
        "artifact {} (sha256:{digest})",
        args.artifact.display()
    ));

    if !app.confirm(&confirm_prompt(&config, &args.cloud.region), true)? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let shell = SshShell::default_runner(SshSettings {
        user: config.build_host.ssh_user.clone(),
        identity: expand_home(&config.build_host.ssh_key),
        connection_attempts: config.build_host.ssh_connection_attempts,
        connect_timeout_secs: SSH_CONNECT_TIMEOUT_SECS,
    });
    let clock = SystemClock;
    let cancel = CancellationToken::new();
    let _interrupt = spawn_interrupt_handler(cancel.clone(), &reporter);

    let pipeline = Pipeline::new(&cloud, &shell, &clock, &reporter, config, cancel);
    let mut run = PipelineRun::new();
    let request = BuildRequest {
        zone: args.zone,
        artifact: args.artifact,
    };

    match pipeline.execute(&mut run, &request).await {
        Ok(image) => {
            app.renderer().render_build(&BuildReport {
                image_id: image.id,
                image_name: image.name,
                region: args.cloud.region,
                stage: run.stage(),
                artifact_sha256: Some(digest),
                resources: run.resources,
                finished_at: clock.now(),
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            app.renderer().render_failure(&failure)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The artifact must be an existing regular file. Returns its SHA-256.
///
/// # Errors
///
/// Returns an error if the path is missing, not a file, or unreadable.
pub fn check_artifact(hasher: &impl FileHasher, artifact: &Path) -> Result<String> {
    let meta = std::fs::metadata(artifact)
        .with_context(|| format!("artifact {} not found", artifact.display()))?;
    anyhow::ensure!(
        meta.is_file(),
        "artifact {} is not a regular file",
        artifact.display()
    );
    hasher.sha256_file(artifact)
}

fn confirm_prompt(config: &BakeConfig, region: &str) -> String {
    format!(
        "This starts a {} build host and a {} GiB volume in {region}; they are billed until you remove them. Continue?",
        config.build_host.instance_type, config.volume.size_gib
    )
}

/// Cancel `cancel` on the first Ctrl-C. The listener stops when the
/// returned guard is dropped.
fn spawn_interrupt_handler(
    cancel: CancellationToken,
    reporter: &impl ProgressReporter,
) -> AbortOnDrop {
    reporter.step("press Ctrl-C to abort (created resources are kept)");
    AbortOnDrop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling build");
            cancel.cancel();
        }
    }))
}

/// Aborts a task when dropped.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
