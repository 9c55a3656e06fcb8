//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod resources;
pub mod staging;
pub mod validate;

pub use config::{BakeConfig, DeviceWait, apply_config_value, validate_config_key};
pub use error::{
    ConfigError, PipelineError, PipelineFailure, ProviderError, ResourceKind, StagingStep,
};
pub use pipeline::PipelineRun;
pub use resources::{
    AttachmentState, BuildHost, Image, InstanceState, Snapshot, SnapshotStatus, Volume,
    VolumeState,
};
