use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage marker of a pipeline run.
///
/// The forward path is `Start → HostProvisioned → VolumeStaged →
/// ImageRegistered → Done`; `Failed` is the only other terminal state.
/// Declaration order is the forward order, so `Ord` compares progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    HostProvisioned,
    VolumeStaged,
    ImageRegistered,
    Done,
    Failed,
}

impl PipelineStage {
    /// Every stage on the forward path, in order.
    pub const FORWARD: [PipelineStage; 5] = [
        PipelineStage::Start,
        PipelineStage::HostProvisioned,
        PipelineStage::VolumeStaged,
        PipelineStage::ImageRegistered,
        PipelineStage::Done,
    ];

    /// The stage that follows this one on the forward path.
    #[must_use]
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Start => Some(PipelineStage::HostProvisioned),
            PipelineStage::HostProvisioned => Some(PipelineStage::VolumeStaged),
            PipelineStage::VolumeStaged => Some(PipelineStage::ImageRegistered),
            PipelineStage::ImageRegistered => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// Human-readable description of the work that leads into this stage.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            PipelineStage::Start => "starting",
            PipelineStage::HostProvisioned => "provisioning build host",
            PipelineStage::VolumeStaged => "staging boot volume",
            PipelineStage::ImageRegistered => "snapshotting volume and registering image",
            PipelineStage::Done => "finishing",
            PipelineStage::Failed => "failed",
        }
    }

    /// Stable snake_case name, identical to the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::HostProvisioned => "host_provisioned",
            PipelineStage::VolumeStaged => "volume_staged",
            PipelineStage::ImageRegistered => "image_registered",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers of every cloud resource a run has created so far.
///
/// Nothing is cleaned up automatically, so these are what an operator needs
/// to find and remove leftovers after a failed (or successful) run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_host_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_host_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl ResourceIds {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Labelled identifiers that are set, in creation order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("build host", self.build_host_id.as_deref()),
            ("build host address", self.build_host_address.as_deref()),
            ("volume", self.volume_id.as_deref()),
            ("snapshot", self.snapshot_id.as_deref()),
            ("image", self.image_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, id)| id.map(|id| (label, id)))
        .collect()
    }
}

/// Result of a successful `amibake build`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub image_id: String,
    pub image_name: String,
    pub region: String,
    pub stage: PipelineStage,
    /// SHA-256 of the unikernel artifact that was baked into the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_sha256: Option<String>,
    pub resources: ResourceIds,
    pub finished_at: DateTime<Utc>,
}

/// Result of `amibake launch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchReport {
    pub instance_id: String,
    pub image_id: String,
    pub region: String,
}
