//! Shared mock infrastructure for unit tests.
//!
//! Provides a [`CommandRunner`] that records every invocation and replays
//! canned outputs, plus output helpers.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use std::time::Duration;

use amibake_cli::application::ports::{CommandRunner, ProcessOptions};
use anyhow::Result;

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(stderr: &[u8]) -> Output {
    Output {
        status: ExitStatus::from_raw(1 << 8),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Recording runner ──────────────────────────────────────────────────────────

/// One recorded process invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Call {
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value following `flag` in the argument list.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Records calls; replays queued outputs, then succeeds with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<Call>>,
    responses: Mutex<VecDeque<Output>>,
}

impl RecordingRunner {
    pub fn with_responses(responses: impl IntoIterator<Item = Output>) -> Self {
        Self {
            calls: Mutex::default(),
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn only_call(&self) -> Call {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one call: {calls:?}");
        calls.into_iter().next().unwrap()
    }

    fn record(&self, program: &str, args: &[&str], options: &ProcessOptions) -> Output {
        self.calls.lock().unwrap().push(Call {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: options.env.clone(),
            current_dir: options.current_dir.clone(),
            timeout: options.timeout,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ok_output(b""))
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        Ok(self.record(program, args, &ProcessOptions::default()))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let options = ProcessOptions {
            timeout: Some(timeout),
            ..ProcessOptions::default()
        };
        Ok(self.record(program, args, &options))
    }

    async fn run_with_options(
        &self,
        program: &str,
        args: &[&str],
        options: &ProcessOptions,
    ) -> Result<Output> {
        Ok(self.record(program, args, options))
    }
}

/// A runner whose process never starts.
pub struct SpawnFailure;

impl CommandRunner for SpawnFailure {
    async fn run(&self, program: &str, _: &[&str]) -> Result<Output> {
        anyhow::bail!("failed to spawn {program}")
    }

    async fn run_with_timeout(&self, program: &str, _: &[&str], _: Duration) -> Result<Output> {
        anyhow::bail!("failed to spawn {program}")
    }

    async fn run_with_options(
        &self,
        program: &str,
        _: &[&str],
        _: &ProcessOptions,
    ) -> Result<Output> {
        anyhow::bail!("failed to spawn {program}")
    }
}
