//! Cloud resource model: build host, volume, snapshot, image.
//!
//! Provider state strings are mapped onto small closed enums here so that
//! readiness predicates never match on raw strings.

use serde::{Deserialize, Serialize};

// ── Build host ────────────────────────────────────────────────────────────────

/// Lifecycle of the build host instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopped,
    Terminated,
}

impl InstanceState {
    /// Map an EC2 instance state name (`pending`, `running`, ...).
    #[must_use]
    pub fn from_provider(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(InstanceState::Pending),
            "running" => Some(InstanceState::Running),
            "stopping" | "stopped" => Some(InstanceState::Stopped),
            "shutting-down" | "terminated" => Some(InstanceState::Terminated),
            _ => None,
        }
    }
}

/// Ephemeral instance the boot volume is staged on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildHost {
    pub id: String,
    pub public_address: Option<String>,
    pub state: InstanceState,
}

impl BuildHost {
    /// Running with an address assigned: reachable over SSH.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.state == InstanceState::Running && self.public_address.is_some()
    }
}

// ── Volume ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    Creating,
    Available,
    InUse,
    Deleted,
    Error,
}

impl VolumeState {
    #[must_use]
    pub fn from_provider(name: &str) -> Option<Self> {
        match name {
            "creating" => Some(VolumeState::Creating),
            "available" => Some(VolumeState::Available),
            "in-use" => Some(VolumeState::InUse),
            "deleting" | "deleted" => Some(VolumeState::Deleted),
            "error" => Some(VolumeState::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentState {
    Detached,
    Attaching,
    Attached,
    Detaching,
}

impl AttachmentState {
    /// Map an EC2 attachment state. `busy` is an attached volume with I/O in flight.
    #[must_use]
    pub fn from_provider(name: &str) -> Option<Self> {
        match name {
            "attaching" => Some(AttachmentState::Attaching),
            "attached" | "busy" => Some(AttachmentState::Attached),
            "detaching" => Some(AttachmentState::Detaching),
            "detached" => Some(AttachmentState::Detached),
            _ => None,
        }
    }
}

/// Block-storage volume that becomes the image's root device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub zone: String,
    pub state: VolumeState,
    pub attachment: AttachmentState,
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Pending,
    Completed,
    Error,
}

impl SnapshotStatus {
    #[must_use]
    pub fn from_provider(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(SnapshotStatus::Pending),
            "completed" => Some(SnapshotStatus::Completed),
            "error" | "recoverable" | "recovering" => Some(SnapshotStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub volume_id: String,
    pub status: SnapshotStatus,
}

// ── Image ─────────────────────────────────────────────────────────────────────

/// Registered, bootable machine image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub snapshot_id: String,
}
