//! `amibake compile`: build a unikernel artifact locally.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::app::AppContext;
use crate::application::ports::{ArtifactBuilder, BuildTarget, ProgressReporter};
use crate::infra::mirage::MirageBuilder;

/// Unikernel backend selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    #[default]
    Xen,
    Unix,
}

impl From<TargetArg> for BuildTarget {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Xen => BuildTarget::Xen,
            TargetArg::Unix => BuildTarget::Unix,
        }
    }
}

/// Arguments for the compile command.
#[derive(Args)]
pub struct CompileArgs {
    /// Unikernel source directory
    pub source_dir: PathBuf,

    /// Backend to build for
    #[arg(long, value_enum, default_value_t)]
    pub target: TargetArg,
}

/// Run `amibake compile`.
///
/// # Errors
///
/// Returns an error if the source directory is missing or the build fails.
pub async fn run(app: &AppContext, args: &CompileArgs) -> Result<ExitCode> {
    let reporter = app.reporter();
    compile(
        &MirageBuilder::default_runner(),
        &args.source_dir,
        args.target.into(),
        &reporter,
    )
    .await?;
    if app.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "source_dir": args.source_dir.display().to_string(),
                "target": BuildTarget::from(args.target).to_string(),
                "success": true,
            }))
            .context("JSON serialization failed")?
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Check the source directory and run the builder for `target`.
///
/// # Errors
///
/// Returns an error if `source_dir` is not a directory or the build fails.
pub async fn compile(
    builder: &impl ArtifactBuilder,
    source_dir: &Path,
    target: BuildTarget,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    anyhow::ensure!(
        source_dir.is_dir(),
        "source directory {} does not exist",
        source_dir.display()
    );
    reporter.step(&format!("compiling {} for {target}...", source_dir.display()));
    builder
        .build(source_dir, target)
        .await
        .with_context(|| format!("failed to compile {}", source_dir.display()))?;
    reporter.success("unikernel compiled");
    Ok(())
}
