//! `amibake launch`: start an instance from a registered image.

use std::process::ExitCode;

use amibake_common::LaunchReport;
use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::{config_service, launch};
use crate::commands::CloudArgs;

/// Arguments for the launch command.
#[derive(Args)]
pub struct LaunchArgs {
    /// Image to boot (`ami-…`)
    #[arg(long)]
    pub image_id: String,

    #[command(flatten)]
    pub cloud: CloudArgs,
}

/// Run `amibake launch`.
///
/// # Errors
///
/// Returns an error if the image id or region is malformed, or the provider
/// refuses the request.
pub async fn run(app: &AppContext, args: &LaunchArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let cloud = args.cloud.client()?;
    let reporter = app.reporter();

    let instance_id =
        launch::launch_instance(&cloud, &args.image_id, &config.launch, &reporter).await?;

    app.renderer().render_launch(&LaunchReport {
        instance_id,
        image_id: args.image_id.clone(),
        region: args.cloud.region.clone(),
    })?;
    Ok(ExitCode::SUCCESS)
}
