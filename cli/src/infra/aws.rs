//! Infrastructure implementation of the cloud port traits.
//!
//! `AwsCli<R>` drives the `aws ec2` command line through a `CommandRunner`
//! and decodes its JSON output. Credentials are handed to the child process
//! environment only; nothing is written to disk.

use std::process::Output;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{
    CommandRunner, ImageApi, ImageRequest, InstanceApi, InstanceRequest, ProcessOptions,
    SnapshotApi, VolumeApi,
};
use crate::domain::provider::classify_cli_error;
use crate::domain::{
    AttachmentState, BuildHost, Image, InstanceState, ProviderError, Snapshot, SnapshotStatus,
    Volume, VolumeState,
};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};

/// Static access key pair passed explicitly to the adapter.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Infrastructure adapter that routes all EC2 calls through a `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct AwsCli<R: CommandRunner> {
    runner: R,
    region: String,
    credentials: Option<Credentials>,
}

impl<R: CommandRunner> AwsCli<R> {
    /// `credentials: None` leaves credential discovery to the CLI
    /// (profiles, instance roles).
    pub fn new(runner: R, region: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            runner,
            region: region.into(),
            credentials,
        }
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The underlying command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn options(&self) -> ProcessOptions {
        let mut env = vec![("AWS_PAGER".to_string(), String::new())];
        if let Some(creds) = &self.credentials {
            env.push(("AWS_ACCESS_KEY_ID".to_string(), creds.access_key_id.clone()));
            env.push((
                "AWS_SECRET_ACCESS_KEY".to_string(),
                creds.secret_access_key.clone(),
            ));
        }
        ProcessOptions {
            env,
            current_dir: None,
            timeout: None,
        }
    }

    /// Run `aws ec2 <subcommand> <args>` and decode its JSON response.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        subcommand: &str,
        args: &[&str],
    ) -> Result<T, ProviderError> {
        let output = self.invoke(operation, subcommand, args).await?;
        serde_json::from_slice(&output.stdout).map_err(|e| {
            ProviderError::other(operation, format!("unexpected response from aws: {e}"))
        })
    }

    async fn invoke(
        &self,
        operation: &str,
        subcommand: &str,
        args: &[&str],
    ) -> Result<Output, ProviderError> {
        let mut full = vec!["ec2", subcommand];
        full.extend_from_slice(args);
        full.extend_from_slice(&["--region", self.region.as_str(), "--output", "json"]);
        tracing::debug!(operation, region = %self.region, "aws call");

        let output = self
            .runner
            .run_with_options("aws", &full, &self.options())
            .await
            .map_err(|e| ProviderError::other(operation, format!("{e:#}")))?;
        if output.status.success() {
            return Ok(output);
        }
        let err = classify_cli_error(operation, &String::from_utf8_lossy(&output.stderr));
        tracing::debug!(operation, error = %err, "aws call failed");
        Err(err)
    }
}

impl AwsCli<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner(region: &str, credentials: Option<Credentials>) -> Self {
        Self::new(
            TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            region,
            credentials,
        )
    }
}

// ── Response shapes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceDescription {
    instance_id: String,
    state: InstanceStateName,
    public_ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceStateName {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstancesResponse {
    instances: Vec<InstanceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    instances: Vec<InstanceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeDescription {
    volume_id: String,
    availability_zone: String,
    state: String,
    #[serde(default)]
    attachments: Vec<VolumeAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeAttachment {
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVolumesResponse {
    volumes: Vec<VolumeDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnapshotDescription {
    snapshot_id: String,
    volume_id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSnapshotsResponse {
    snapshots: Vec<SnapshotDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RegisterImageResponse {
    image_id: String,
}

// ── Conversions ───────────────────────────────────────────────────────────────

fn unrecognised(operation: &str, what: &str, value: &str) -> ProviderError {
    ProviderError::other(operation, format!("unrecognised {what} '{value}'"))
}

fn to_build_host(operation: &str, d: InstanceDescription) -> Result<BuildHost, ProviderError> {
    let state = InstanceState::from_provider(&d.state.name)
        .ok_or_else(|| unrecognised(operation, "instance state", &d.state.name))?;
    Ok(BuildHost {
        id: d.instance_id,
        public_address: d.public_ip_address.filter(|a| !a.is_empty()),
        state,
    })
}

fn to_volume(operation: &str, d: VolumeDescription) -> Result<Volume, ProviderError> {
    let state = VolumeState::from_provider(&d.state)
        .ok_or_else(|| unrecognised(operation, "volume state", &d.state))?;
    let attachment = match d.attachments.first() {
        None => AttachmentState::Detached,
        Some(a) => AttachmentState::from_provider(&a.state)
            .ok_or_else(|| unrecognised(operation, "attachment state", &a.state))?,
    };
    Ok(Volume {
        id: d.volume_id,
        zone: d.availability_zone,
        state,
        attachment,
    })
}

fn to_snapshot(operation: &str, d: SnapshotDescription) -> Result<Snapshot, ProviderError> {
    let status = SnapshotStatus::from_provider(&d.state)
        .ok_or_else(|| unrecognised(operation, "snapshot state", &d.state))?;
    Ok(Snapshot {
        id: d.snapshot_id,
        volume_id: d.volume_id,
        status,
    })
}

fn only<T>(operation: &str, id: &str, items: Vec<T>) -> Result<T, ProviderError> {
    items
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::other(operation, format!("{id} missing from response")))
}

// ── Port implementations ──────────────────────────────────────────────────────

impl<R: CommandRunner> InstanceApi for AwsCli<R> {
    async fn run_instance(&self, request: &InstanceRequest<'_>) -> Result<BuildHost, ProviderError> {
        const OP: &str = "RunInstances";
        let placement = request.zone.map(|zone| format!("AvailabilityZone={zone}"));
        let mut args = vec![
            "--image-id",
            request.image_id,
            "--instance-type",
            request.instance_type,
            "--count",
            "1",
            "--security-groups",
            request.security_group,
        ];
        if let Some(key) = request.key_name {
            args.extend_from_slice(&["--key-name", key]);
        }
        if let Some(placement) = &placement {
            args.extend_from_slice(&["--placement", placement.as_str()]);
        }
        let resp: RunInstancesResponse = self.call(OP, "run-instances", &args).await?;
        to_build_host(OP, only(OP, "instance", resp.instances)?)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<BuildHost, ProviderError> {
        const OP: &str = "DescribeInstances";
        let resp: DescribeInstancesResponse = self
            .call(OP, "describe-instances", &["--instance-ids", instance_id])
            .await?;
        let instances = resp
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .collect();
        to_build_host(OP, only(OP, instance_id, instances)?)
    }
}

impl<R: CommandRunner> VolumeApi for AwsCli<R> {
    async fn create_volume(&self, size_gib: u32, zone: &str) -> Result<Volume, ProviderError> {
        const OP: &str = "CreateVolume";
        let size = size_gib.to_string();
        let resp: VolumeDescription = self
            .call(
                OP,
                "create-volume",
                &["--size", &size, "--availability-zone", zone],
            )
            .await?;
        to_volume(OP, resp)
    }

    async fn describe_volume(&self, volume_id: &str) -> Result<Volume, ProviderError> {
        const OP: &str = "DescribeVolumes";
        let resp: DescribeVolumesResponse = self
            .call(OP, "describe-volumes", &["--volume-ids", volume_id])
            .await?;
        to_volume(OP, only(OP, volume_id, resp.volumes)?)
    }

    async fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<(), ProviderError> {
        self.invoke(
            "AttachVolume",
            "attach-volume",
            &[
                "--volume-id",
                volume_id,
                "--instance-id",
                instance_id,
                "--device",
                device,
            ],
        )
        .await?;
        Ok(())
    }
}

impl<R: CommandRunner> SnapshotApi for AwsCli<R> {
    async fn create_snapshot(&self, volume_id: &str) -> Result<Snapshot, ProviderError> {
        const OP: &str = "CreateSnapshot";
        let resp: SnapshotDescription = self
            .call(OP, "create-snapshot", &["--volume-id", volume_id])
            .await?;
        to_snapshot(OP, resp)
    }

    async fn describe_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, ProviderError> {
        const OP: &str = "DescribeSnapshots";
        let resp: DescribeSnapshotsResponse = self
            .call(OP, "describe-snapshots", &["--snapshot-ids", snapshot_id])
            .await?;
        to_snapshot(OP, only(OP, snapshot_id, resp.snapshots)?)
    }
}

impl<R: CommandRunner> ImageApi for AwsCli<R> {
    async fn register_image(&self, request: &ImageRequest<'_>) -> Result<Image, ProviderError> {
        const OP: &str = "RegisterImage";
        let mappings = serde_json::json!([{
            "DeviceName": request.root_device,
            "Ebs": { "SnapshotId": request.snapshot_id },
        }])
        .to_string();
        let resp: RegisterImageResponse = self
            .call(
                OP,
                "register-image",
                &[
                    "--name",
                    request.name,
                    "--architecture",
                    request.architecture,
                    "--kernel-id",
                    request.kernel_id,
                    "--root-device-name",
                    request.root_device,
                    "--block-device-mappings",
                    &mappings,
                ],
            )
            .await?;
        Ok(Image {
            id: resp.image_id,
            name: request.name.to_string(),
            snapshot_id: request.snapshot_id.to_string(),
        })
    }
}
