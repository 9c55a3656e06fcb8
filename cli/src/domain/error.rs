//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use amibake_common::{PipelineStage, ResourceIds};
use thiserror::Error;

// ── Provider errors ───────────────────────────────────────────────────────────

/// Classification of a failed cloud control-plane call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Throttling, service hiccups, or eventual-consistency lag. Safe to retry.
    #[error("{operation} failed transiently ({code}): {message}")]
    Transient {
        operation: String,
        code: String,
        message: String,
    },

    /// The provider refused the request. Retrying will not help.
    #[error("{operation} rejected ({code}): {message}")]
    Rejected {
        operation: String,
        code: String,
        message: String,
    },

    /// The call could not be made or its response could not be understood.
    #[error("{operation} failed: {message}")]
    Other { operation: String, message: String },
}

impl ProviderError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }

    /// Name of the provider operation that failed.
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            ProviderError::Transient { operation, .. }
            | ProviderError::Rejected { operation, .. }
            | ProviderError::Other { operation, .. } => operation,
        }
    }

    pub fn other(operation: &str, message: impl Into<String>) -> Self {
        ProviderError::Other {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

// ── Pipeline errors ───────────────────────────────────────────────────────────

/// Cloud resource kinds created by a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    BuildHost,
    Volume,
    Snapshot,
    Image,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceKind::BuildHost => "build host",
            ResourceKind::Volume => "volume",
            ResourceKind::Snapshot => "snapshot",
            ResourceKind::Image => "image",
        })
    }
}

/// Sub-steps of volume staging, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StagingStep {
    Attach,
    DeviceSettle,
    Format,
    Mount,
    BootloaderDir,
    BootloaderMenu,
    UploadArtifact,
    CompressArtifact,
    Unmount,
}

impl std::fmt::Display for StagingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StagingStep::Attach => "attach",
            StagingStep::DeviceSettle => "device settle",
            StagingStep::Format => "format",
            StagingStep::Mount => "mount",
            StagingStep::BootloaderDir => "bootloader directory",
            StagingStep::BootloaderMenu => "bootloader menu",
            StagingStep::UploadArtifact => "upload artifact",
            StagingStep::CompressArtifact => "compress artifact",
            StagingStep::Unmount => "unmount",
        })
    }
}

/// Failure of a single pipeline component.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{resource} creation rejected: {source}")]
    Provision {
        resource: ResourceKind,
        #[source]
        source: ProviderError,
    },

    #[error("timed out after {}s waiting for {what}", .waited.as_secs())]
    Timeout { what: String, waited: Duration },

    #[error("gave up after {attempts} attempts: {source}")]
    TransientProvider {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("{what} failed permanently: {reason}")]
    FatalProvider { what: String, reason: String },

    #[error("staging step '{step}' failed ({}): {message}", display_exit_code(.exit_code.as_ref()))]
    Staging {
        step: StagingStep,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("image registration failed: {reason}")]
    Registration { reason: String },

    #[error("pipeline run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Stable machine-readable error code used in JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Provision { .. } => "provision_error",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::TransientProvider { .. } => "transient_provider_error",
            PipelineError::FatalProvider { .. } => "fatal_provider_error",
            PipelineError::Staging { .. } => "staging_error",
            PipelineError::Registration { .. } => "registration_error",
            PipelineError::Cancelled => "cancelled",
        }
    }
}

fn display_exit_code(code: Option<&i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |c| format!("exit code {c}"))
}

/// Terminal failure of a pipeline run.
///
/// Carries everything an operator needs to clean up by hand: the stage the
/// run was working towards, the ids of resources created so far, and the
/// underlying component error.
#[derive(Debug, Error)]
#[error(
    "pipeline failed while {} (stage '{stage}'): {error}\nresources created so far: {}",
    .stage.description(),
    describe_resources(.resources)
)]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub resources: ResourceIds,
    #[source]
    pub error: PipelineError,
}

fn describe_resources(ids: &ResourceIds) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.entries()
        .iter()
        .map(|(label, id)| format!("{label} {id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
