//! Human-readable terminal renderer.

use amibake_common::{BuildReport, LaunchReport};
use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;

use crate::domain::{BakeConfig, PipelineFailure};
use crate::output::OutputContext;

/// Renders results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the result of a successful build.
    ///
    /// In quiet mode only the image id is printed, so the output can be
    /// captured by scripts.
    pub fn render_build(&self, report: &BuildReport) {
        if self.ctx.quiet {
            println!("{}", report.image_id);
            return;
        }
        println!();
        self.ctx.success(&format!(
            "registered image {}",
            report.image_id.style(self.ctx.styles.bold)
        ));
        self.ctx.kv("Name:     ", &report.image_name);
        self.ctx.kv("Region:   ", &report.region);
        if let Some(digest) = &report.artifact_sha256 {
            self.ctx.kv("Artifact: ", &format!("sha256:{digest}"));
        }
        let left_behind: Vec<_> = report
            .resources
            .entries()
            .into_iter()
            .filter(|(label, _)| *label != "image" && *label != "build host address")
            .collect();
        if !left_behind.is_empty() {
            println!();
            self.ctx.header("Left running (not cleaned up automatically):");
            for (label, id) in left_behind {
                self.ctx.kv(&format!("{label:<10}"), id);
            }
        }
        println!();
        self.ctx.info(&format!(
            "Launch it with: amibake launch --image-id {} --region {}",
            report.image_id, report.region
        ));
    }

    /// Render a failed build: the stage, the error, and what to clean up.
    pub fn render_failure(&self, failure: &PipelineFailure) {
        self.ctx.error(&format!(
            "build failed while {} (stage '{}')",
            failure.stage.description(),
            failure.stage
        ));
        self.ctx.error(&failure.error.to_string());
        if failure.resources.is_empty() {
            self.ctx.error("no cloud resources were created");
            return;
        }
        self.ctx.error("resources created so far (clean up manually):");
        for (label, id) in failure.resources.entries() {
            eprintln!("      {label:<18} {id}");
        }
    }

    pub fn render_launch(&self, report: &LaunchReport) {
        if self.ctx.quiet {
            println!("{}", report.instance_id);
            return;
        }
        self.ctx.success(&format!(
            "launched instance {} from {} in {}",
            report.instance_id.style(self.ctx.styles.bold),
            report.image_id,
            report.region
        ));
    }

    /// Render the effective configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn render_config(&self, config: &BakeConfig, path: &std::path::Path) -> Result<()> {
        let yaml = serde_yaml::to_string(config).context("cannot serialize config")?;
        if !self.ctx.quiet {
            self.ctx
                .header(&format!("Configuration ({})", path.display()));
            println!();
        }
        print!("{yaml}");
        Ok(())
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("amibake {version}");
    }
}
