//! Domain types and validators for amibake configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "build_host.image_id",
    "build_host.instance_type",
    "build_host.key_name",
    "build_host.security_group",
    "build_host.ssh_user",
    "build_host.ssh_key",
    "build_host.ssh_connection_attempts",
    "volume.size_gib",
    "volume.device",
    "volume.mount_point",
    "volume.device_wait",
    "volume.settle_secs",
    "image.name_prefix",
    "image.kernel_id",
    "image.architecture",
    "polling.interval_secs",
    "polling.instance_timeout_secs",
    "polling.volume_timeout_secs",
    "polling.attachment_timeout_secs",
    "polling.snapshot_timeout_secs",
    "retry.attempts",
    "retry.backoff_ms",
    "launch.instance_type",
    "launch.security_group",
];

pub const VALID_ARCHITECTURES: &[&str] = &["i386", "x86_64"];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.amibake/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    pub build_host: BuildHostConfig,
    pub volume: VolumeConfig,
    pub image: ImageConfig,
    pub polling: PollingConfig,
    pub retry: RetryConfig,
    pub launch: LaunchConfig,
}

/// Ephemeral instance the boot volume is prepared on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildHostConfig {
    /// Machine image the build host boots from.
    pub image_id: String,
    pub instance_type: String,
    /// Key pair name registered with the provider.
    pub key_name: String,
    pub security_group: String,
    pub ssh_user: String,
    /// Private key matching `key_name`. A leading `~/` is expanded.
    pub ssh_key: String,
    pub ssh_connection_attempts: u32,
}

impl Default for BuildHostConfig {
    fn default() -> Self {
        Self {
            image_id: "ami-2d18e35a".to_string(),
            instance_type: "t1.micro".to_string(),
            key_name: "mirage-www".to_string(),
            security_group: "mirage-unikernel-builder".to_string(),
            ssh_user: "ec2-user".to_string(),
            ssh_key: "~/.ssh/mirage-www.pem".to_string(),
            ssh_connection_attempts: 5,
        }
    }
}

/// How to wait for the attached device node to appear in the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceWait {
    /// Poll the build host for the device node, up to `settle_secs`.
    Poll,
    /// Sleep for `settle_secs` unconditionally.
    Fixed,
}

impl DeviceWait {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "poll" => Some(DeviceWait::Poll),
            "fixed" => Some(DeviceWait::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub size_gib: u32,
    /// Device path the volume is attached at; also the image's root device.
    pub device: String,
    pub mount_point: String,
    pub device_wait: DeviceWait,
    pub settle_secs: u64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            size_gib: 1,
            device: "/dev/sdh".to_string(),
            mount_point: "/mnt".to_string(),
            device_wait: DeviceWait::Poll,
            settle_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub name_prefix: String,
    /// Pre-known boot-loader kernel (PV-GRUB) for the region.
    pub kernel_id: String,
    pub architecture: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            name_prefix: "mirage".to_string(),
            kernel_id: "aki-52a34525".to_string(),
            architecture: "x86_64".to_string(),
        }
    }
}

/// Poll interval and per-resource wait deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub instance_timeout_secs: u64,
    pub volume_timeout_secs: u64,
    pub attachment_timeout_secs: u64,
    pub snapshot_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            instance_timeout_secs: 600,
            volume_timeout_secs: 300,
            attachment_timeout_secs: 300,
            snapshot_timeout_secs: 3600,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Bounded retry of transient provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub instance_type: String,
    pub security_group: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            instance_type: "t1.micro".to_string(),
            security_group: "mirage-www".to_string(),
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the key is unknown or the value has the wrong type.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    apply_config_value(&mut BakeConfig::default(), key, value)
}

/// Sets `key` to `value` in `config`, parsing the value to the key's type.
///
/// # Errors
///
/// Returns an error if the key is unknown or the value does not parse.
pub fn apply_config_value(config: &mut BakeConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "build_host.image_id" => config.build_host.image_id = non_empty(key, value)?,
        "build_host.instance_type" => config.build_host.instance_type = non_empty(key, value)?,
        "build_host.key_name" => config.build_host.key_name = non_empty(key, value)?,
        "build_host.security_group" => config.build_host.security_group = non_empty(key, value)?,
        "build_host.ssh_user" => config.build_host.ssh_user = non_empty(key, value)?,
        "build_host.ssh_key" => config.build_host.ssh_key = non_empty(key, value)?,
        "build_host.ssh_connection_attempts" => {
            config.build_host.ssh_connection_attempts = positive(key, value)?;
        }
        "volume.size_gib" => config.volume.size_gib = positive(key, value)?,
        "volume.device" => config.volume.device = device_path(key, value)?,
        "volume.mount_point" => config.volume.mount_point = absolute_path(key, value)?,
        "volume.device_wait" => {
            config.volume.device_wait =
                DeviceWait::parse(value).ok_or_else(|| invalid(key, value, "poll, fixed"))?;
        }
        "volume.settle_secs" => config.volume.settle_secs = positive(key, value)?,
        "image.name_prefix" => config.image.name_prefix = non_empty(key, value)?,
        "image.kernel_id" => config.image.kernel_id = non_empty(key, value)?,
        "image.architecture" => {
            if !VALID_ARCHITECTURES.contains(&value) {
                return Err(invalid(key, value, &VALID_ARCHITECTURES.join(", ")).into());
            }
            config.image.architecture = value.to_string();
        }
        "polling.interval_secs" => config.polling.interval_secs = positive(key, value)?,
        "polling.instance_timeout_secs" => {
            config.polling.instance_timeout_secs = positive(key, value)?;
        }
        "polling.volume_timeout_secs" => config.polling.volume_timeout_secs = positive(key, value)?,
        "polling.attachment_timeout_secs" => {
            config.polling.attachment_timeout_secs = positive(key, value)?;
        }
        "polling.snapshot_timeout_secs" => {
            config.polling.snapshot_timeout_secs = positive(key, value)?;
        }
        "retry.attempts" => config.retry.attempts = positive(key, value)?,
        "retry.backoff_ms" => {
            config.retry.backoff_ms = value
                .parse()
                .map_err(|_| invalid(key, value, "a non-negative integer"))?;
        }
        "launch.instance_type" => config.launch.instance_type = non_empty(key, value)?,
        "launch.security_group" => config.launch.security_group = non_empty(key, value)?,
        _ => {
            return Err(ConfigError::UnknownKey {
                key: key.to_string(),
                valid: VALID_CONFIG_KEYS.join(", "),
            }
            .into());
        }
    }
    Ok(())
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(invalid(key, value, "a non-empty string").into());
    }
    Ok(value.to_string())
}

fn positive<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid(key, value, "a positive integer").into()),
    }
}

fn absolute_path(key: &str, value: &str) -> Result<String> {
    if !value.starts_with('/') {
        return Err(invalid(key, value, "an absolute path").into());
    }
    Ok(value.to_string())
}

fn device_path(key: &str, value: &str) -> Result<String> {
    if !value.starts_with("/dev/") || value.len() <= "/dev/".len() {
        return Err(invalid(key, value, "a device path such as /dev/sdh").into());
    }
    Ok(value.to_string())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
