//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::{BakeConfig, BuildHost, Image, ProviderError, Snapshot, Volume};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Parameters for launching a single instance.
#[derive(Debug, Clone, Copy)]
pub struct InstanceRequest<'a> {
    /// Machine image to boot, e.g. `"ami-2d18e35a"`.
    pub image_id: &'a str,
    /// Instance type, e.g. `"t1.micro"`.
    pub instance_type: &'a str,
    /// Key pair name. `None` launches without SSH access.
    pub key_name: Option<&'a str>,
    pub security_group: &'a str,
    /// Availability zone to place the instance in. `None` lets the
    /// provider choose.
    pub zone: Option<&'a str>,
}

/// Parameters for registering a bootable image from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ImageRequest<'a> {
    pub name: &'a str,
    pub snapshot_id: &'a str,
    pub kernel_id: &'a str,
    pub architecture: &'a str,
    /// Root device name; the snapshot is mapped to it.
    pub root_device: &'a str,
}

/// Environment, working directory, and deadline for one child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    /// Overrides the runner's default timeout.
    pub timeout: Option<Duration>,
}

/// Unikernel backend the artifact is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    Xen,
    Unix,
}

impl std::fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BuildTarget::Xen => "xen",
            BuildTarget::Unix => "unix",
        })
    }
}

// ── Cloud Port Traits ─────────────────────────────────────────────────────────

/// Compute instances: launch and describe.
#[allow(async_fn_in_trait)]
pub trait InstanceApi {
    /// Launch one instance. Returns as soon as the provider assigns an id.
    async fn run_instance(&self, request: &InstanceRequest<'_>) -> Result<BuildHost, ProviderError>;
    /// Refresh an instance's lifecycle state and address.
    async fn describe_instance(&self, instance_id: &str) -> Result<BuildHost, ProviderError>;
}

/// Block-storage volumes: create, describe, attach.
#[allow(async_fn_in_trait)]
pub trait VolumeApi {
    async fn create_volume(&self, size_gib: u32, zone: &str) -> Result<Volume, ProviderError>;
    async fn describe_volume(&self, volume_id: &str) -> Result<Volume, ProviderError>;
    /// Request attachment. Completion is observed via `describe_volume`.
    async fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<(), ProviderError>;
}

/// Point-in-time volume snapshots.
#[allow(async_fn_in_trait)]
pub trait SnapshotApi {
    async fn create_snapshot(&self, volume_id: &str) -> Result<Snapshot, ProviderError>;
    async fn describe_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, ProviderError>;
}

/// Machine image registration.
#[allow(async_fn_in_trait)]
pub trait ImageApi {
    async fn register_image(&self, request: &ImageRequest<'_>) -> Result<Image, ProviderError>;
}

/// Composite trait: any type implementing all four sub-traits is a `CloudProvider`.
pub trait CloudProvider: InstanceApi + VolumeApi + SnapshotApi + ImageApi {}

/// Blanket implementation: any type implementing all four sub-traits is a `CloudProvider`.
impl<T> CloudProvider for T where T: InstanceApi + VolumeApi + SnapshotApi + ImageApi {}

// ── Remote Execution Port ─────────────────────────────────────────────────────

/// Runs commands on a remote host over a secure channel.
///
/// A non-zero remote exit status is reported in the returned `Output`, not
/// as an error; errors mean the channel itself could not be used.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Run `command` as the login user.
    async fn run(&self, host: &str, command: &str) -> Result<Output>;
    /// Run `command` with superuser privilege.
    async fn run_privileged(&self, host: &str, command: &str) -> Result<Output>;
    /// Copy a local file to `remote` on the host.
    async fn upload(&self, host: &str, local: &Path, remote: &str) -> Result<Output>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(&self, program: &str, args: &[&str], timeout: Duration)
    -> Result<Output>;
    /// Run a program with extra environment variables and a working directory.
    ///
    /// # Errors
    ///
    /// Same as `run_with_timeout`.
    async fn run_with_options(
        &self,
        program: &str,
        args: &[&str],
        options: &ProcessOptions,
    ) -> Result<Output>;
}

// ── Artifact Build Port ───────────────────────────────────────────────────────

/// Opaque unikernel build: only pass/fail is interpreted.
#[allow(async_fn_in_trait)]
pub trait ArtifactBuilder {
    /// Compile the unikernel in `source_dir` for `target`.
    async fn build(&self, source_dir: &Path, target: BuildTarget) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Clock, Filesystem and Config Ports ────────────────────────────────────────

/// Wall-clock source, injected so image naming is testable.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Abstracts file hashing operations.
pub trait FileHasher {
    /// Compute the SHA-256 hash of a file as lowercase hex.
    fn sha256_file(&self, path: &Path) -> Result<String>;
}

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults if none is stored.
    fn load(&self) -> Result<BakeConfig>;
    /// Persist the configuration.
    fn save(&self, config: &BakeConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
