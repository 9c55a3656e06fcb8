//! Shared fakes for pipeline service tests.
//!
//! `FakeCloud` and `FakeShell` write to one shared event log so tests can
//! assert the relative order of provider calls and remote commands.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::path::Path;
use std::process::Output;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::application::ports::{
    Clock, ImageApi, ImageRequest, InstanceApi, InstanceRequest, ProgressReporter, RemoteShell,
    SnapshotApi, VolumeApi,
};
use crate::domain::{
    AttachmentState, BuildHost, Image, InstanceState, ProviderError, Snapshot, SnapshotStatus,
    Volume, VolumeState,
};

/// Build an `ExitStatus` from a logical exit code (cross-platform).
#[cfg(unix)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    std::process::ExitStatus::from_raw(code as u32)
}

pub fn output(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Never becomes ready.
pub const NEVER: u32 = u32::MAX;

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn rejected(operation: &str, code: &str) -> ProviderError {
    ProviderError::Rejected {
        operation: operation.to_string(),
        code: code.to_string(),
        message: "injected".to_string(),
    }
}

pub fn transient(operation: &str) -> ProviderError {
    ProviderError::Transient {
        operation: operation.to_string(),
        code: "RequestLimitExceeded".to_string(),
        message: "injected".to_string(),
    }
}

// ── FakeCloud ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CloudState {
    instances: u32,
    instance_polls: u32,
    volume_polls: u32,
    attach_requested: bool,
    attach_polls: u32,
    snapshot_polls: u32,
}

/// Scripted provider: each resource becomes ready after a fixed number of
/// describe calls. Defaults reproduce the reference success scenario.
pub struct FakeCloud {
    pub log: EventLog,
    pub instance_ready_after: u32,
    pub instance_address: String,
    /// Report the instance as terminated instead of running.
    pub instance_terminates: bool,
    pub volume_ready_after: u32,
    pub attach_ready_after: u32,
    pub snapshot_ready_after: u32,
    /// Report the snapshot in the error state once it would complete.
    pub snapshot_errors: bool,
    pub image_id: String,
    pub run_instance_error: Option<ProviderError>,
    pub create_volume_error: Option<ProviderError>,
    pub attach_error: Option<ProviderError>,
    pub create_snapshot_error: Option<ProviderError>,
    /// Returned by successive `register_image` calls before it succeeds.
    pub register_errors: Mutex<VecDeque<ProviderError>>,
    /// Returned by successive `describe_volume` calls before it answers.
    pub describe_volume_errors: Mutex<VecDeque<ProviderError>>,
    state: Mutex<CloudState>,
}

impl FakeCloud {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            instance_ready_after: 2,
            instance_address: "10.0.0.5".to_string(),
            instance_terminates: false,
            volume_ready_after: 1,
            attach_ready_after: 3,
            snapshot_ready_after: 5,
            snapshot_errors: false,
            image_id: "img-0001".to_string(),
            run_instance_error: None,
            create_volume_error: None,
            attach_error: None,
            create_snapshot_error: None,
            register_errors: Mutex::new(VecDeque::new()),
            describe_volume_errors: Mutex::new(VecDeque::new()),
            state: Mutex::new(CloudState::default()),
        }
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }

    pub fn attach_polls(&self) -> u32 {
        self.state.lock().unwrap().attach_polls
    }

    pub fn snapshot_polls(&self) -> u32 {
        self.state.lock().unwrap().snapshot_polls
    }
}

impl InstanceApi for FakeCloud {
    async fn run_instance(&self, request: &InstanceRequest<'_>) -> Result<BuildHost, ProviderError> {
        let mut event = format!(
            "run_instance image={} type={}",
            request.image_id, request.instance_type
        );
        if let Some(zone) = request.zone {
            event.push_str(&format!(" zone={zone}"));
        }
        self.record(event);
        if let Some(err) = &self.run_instance_error {
            return Err(err.clone());
        }
        let mut state = self.state.lock().unwrap();
        state.instances += 1;
        Ok(BuildHost {
            id: format!("i-{:04}", state.instances),
            public_address: None,
            state: InstanceState::Pending,
        })
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<BuildHost, ProviderError> {
        let polls = {
            let mut state = self.state.lock().unwrap();
            state.instance_polls += 1;
            state.instance_polls
        };
        let state = if polls < self.instance_ready_after {
            InstanceState::Pending
        } else if self.instance_terminates {
            InstanceState::Terminated
        } else {
            InstanceState::Running
        };
        self.record(format!("describe_instance {state:?}"));
        Ok(BuildHost {
            id: instance_id.to_string(),
            public_address: (state == InstanceState::Running)
                .then(|| self.instance_address.clone()),
            state,
        })
    }
}

impl VolumeApi for FakeCloud {
    async fn create_volume(&self, size_gib: u32, zone: &str) -> Result<Volume, ProviderError> {
        self.record(format!("create_volume size={size_gib} zone={zone}"));
        if let Some(err) = &self.create_volume_error {
            return Err(err.clone());
        }
        Ok(Volume {
            id: "vol-0001".to_string(),
            zone: zone.to_string(),
            state: VolumeState::Creating,
            attachment: AttachmentState::Detached,
        })
    }

    async fn describe_volume(&self, volume_id: &str) -> Result<Volume, ProviderError> {
        if let Some(err) = self.describe_volume_errors.lock().unwrap().pop_front() {
            self.record("describe_volume error".to_string());
            return Err(err);
        }
        let (state, attachment) = {
            let mut s = self.state.lock().unwrap();
            if s.attach_requested {
                s.attach_polls += 1;
                if s.attach_polls < self.attach_ready_after {
                    (VolumeState::InUse, AttachmentState::Attaching)
                } else {
                    (VolumeState::InUse, AttachmentState::Attached)
                }
            } else {
                s.volume_polls += 1;
                if s.volume_polls < self.volume_ready_after {
                    (VolumeState::Creating, AttachmentState::Detached)
                } else {
                    (VolumeState::Available, AttachmentState::Detached)
                }
            }
        };
        self.record(format!("describe_volume {state:?} {attachment:?}"));
        Ok(Volume {
            id: volume_id.to_string(),
            zone: "eu-west-1b".to_string(),
            state,
            attachment,
        })
    }

    async fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<(), ProviderError> {
        self.record(format!("attach_volume {volume_id} {instance_id} {device}"));
        if let Some(err) = &self.attach_error {
            return Err(err.clone());
        }
        self.state.lock().unwrap().attach_requested = true;
        Ok(())
    }
}

impl SnapshotApi for FakeCloud {
    async fn create_snapshot(&self, volume_id: &str) -> Result<Snapshot, ProviderError> {
        self.record(format!("create_snapshot {volume_id}"));
        if let Some(err) = &self.create_snapshot_error {
            return Err(err.clone());
        }
        Ok(Snapshot {
            id: "snap-0001".to_string(),
            volume_id: volume_id.to_string(),
            status: SnapshotStatus::Pending,
        })
    }

    async fn describe_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, ProviderError> {
        let polls = {
            let mut state = self.state.lock().unwrap();
            state.snapshot_polls += 1;
            state.snapshot_polls
        };
        let status = if polls < self.snapshot_ready_after {
            SnapshotStatus::Pending
        } else if self.snapshot_errors {
            SnapshotStatus::Error
        } else {
            SnapshotStatus::Completed
        };
        self.record(format!("describe_snapshot {status:?}"));
        Ok(Snapshot {
            id: snapshot_id.to_string(),
            volume_id: "vol-0001".to_string(),
            status,
        })
    }
}

impl ImageApi for FakeCloud {
    async fn register_image(&self, request: &ImageRequest<'_>) -> Result<Image, ProviderError> {
        self.record(format!(
            "register_image name={} snapshot={} kernel={} arch={} root={}",
            request.name,
            request.snapshot_id,
            request.kernel_id,
            request.architecture,
            request.root_device
        ));
        if let Some(err) = self.register_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(Image {
            id: self.image_id.clone(),
            name: request.name.to_string(),
            snapshot_id: request.snapshot_id.to_string(),
        })
    }
}

// ── FakeShell ─────────────────────────────────────────────────────────────────

/// Recording remote shell. Every command succeeds unless it contains one
/// of the `fail_on` patterns.
pub struct FakeShell {
    pub log: EventLog,
    /// `(pattern, exit code)`; the first pattern contained in a command wins.
    pub fail_on: Vec<(String, i32)>,
    /// Commands containing this pattern never finish.
    pub hang_on: Option<String>,
    /// Node reported by the device probe.
    pub device_node: String,
    pub device_ready_after: u32,
    probes: Mutex<u32>,
}

impl FakeShell {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_on: Vec::new(),
            hang_on: None,
            device_node: "/dev/sdh".to_string(),
            device_ready_after: 1,
            probes: Mutex::new(0),
        }
    }

    async fn respond(&self, kind: &str, command: &str) -> Output {
        if command.contains("[ -b ") {
            let mut probes = self.probes.lock().unwrap();
            *probes += 1;
            self.log.lock().unwrap().push(format!("probe {}", *probes));
            return if *probes >= self.device_ready_after {
                output(0, &format!("{}\n", self.device_node), "")
            } else {
                output(1, "", "")
            };
        }
        self.log.lock().unwrap().push(format!("{kind} {command}"));
        if let Some(pattern) = &self.hang_on
            && command.contains(pattern.as_str())
        {
            std::future::pending::<()>().await;
        }
        for (pattern, code) in &self.fail_on {
            if command.contains(pattern.as_str()) {
                return output(*code, "", "injected failure");
            }
        }
        output(0, "", "")
    }
}

impl RemoteShell for FakeShell {
    async fn run(&self, _host: &str, command: &str) -> anyhow::Result<Output> {
        Ok(self.respond("run", command).await)
    }

    async fn run_privileged(&self, _host: &str, command: &str) -> anyhow::Result<Output> {
        Ok(self.respond("sudo", command).await)
    }

    async fn upload(&self, _host: &str, local: &Path, remote: &str) -> anyhow::Result<Output> {
        let command = format!("{} {remote}", local.display());
        Ok(self.respond("upload", &command).await)
    }
}

// ── Clock and reporter ────────────────────────────────────────────────────────

pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self(Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}

/// Index of the first event starting with `prefix`.
pub fn position(events: &[String], prefix: &str) -> Option<usize> {
    events.iter().position(|e| e.starts_with(prefix))
}
