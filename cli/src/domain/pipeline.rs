//! Pipeline run state: stage marker, history, and the entities created.
//!
//! The stage marker only ever moves forward along
//! `Start → HostProvisioned → VolumeStaged → ImageRegistered → Done`,
//! or jumps to the terminal `Failed`.

use amibake_common::{PipelineStage, ResourceIds};

use crate::domain::resources::{BuildHost, Image, Snapshot, Volume};

/// Ephemeral aggregate for one invocation of the pipeline. Never persisted.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    stage: PipelineStage,
    history: Vec<PipelineStage>,
    /// Ids recorded as soon as each resource is created.
    pub resources: ResourceIds,
    pub build_host: Option<BuildHost>,
    pub volume: Option<Volume>,
    pub snapshot: Option<Snapshot>,
    pub image: Option<Image>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Start,
            history: vec![PipelineStage::Start],
            resources: ResourceIds::default(),
            build_host: None,
            volume: None,
            snapshot: None,
            image: None,
        }
    }

    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Every stage the run has been in, oldest first.
    #[must_use]
    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    /// The stage the run is currently working towards, if any.
    #[must_use]
    pub fn target(&self) -> Option<PipelineStage> {
        self.stage.next()
    }

    /// Move to the next stage on the forward path. Returns the new stage,
    /// or `None` if the run is already terminal.
    pub fn advance(&mut self) -> Option<PipelineStage> {
        let next = self.stage.next()?;
        self.transition(next);
        Some(next)
    }

    /// Enter the terminal `Failed` state. A finished run stays finished.
    pub fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.transition(PipelineStage::Failed);
        }
    }

    fn transition(&mut self, to: PipelineStage) {
        self.stage = to;
        self.history.push(to);
    }
}
