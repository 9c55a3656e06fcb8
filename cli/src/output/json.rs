//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails, and the renderer for successful results.

use amibake_common::{BuildReport, LaunchReport};
use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{BakeConfig, PipelineFailure};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format a pipeline failure as a JSON error object that also carries the
/// stage being worked towards and the resources created so far.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_pipeline_failure(failure: &PipelineFailure) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": failure.error.to_string(),
        "code": failure.error.code(),
        "stage": failure.stage,
        "resources": failure.resources,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine-readable renderer: one pretty-printed JSON document on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_build(&self, report: &BuildReport) -> Result<()> {
        print_json(report)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_failure(&self, failure: &PipelineFailure) -> Result<()> {
        println!("{}", format_pipeline_failure(failure)?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_launch(&self, report: &LaunchReport) -> Result<()> {
        print_json(report)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(&self, config: &BakeConfig, path: &std::path::Path) -> Result<()> {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        print_json(&serde_json::json!({ "version": version }))
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}
