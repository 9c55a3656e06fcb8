//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill on all platforms.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::application::ports::{CommandRunner, ProcessOptions};

/// Default timeout for cloud CLI calls.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for remote commands and uploads over SSH.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for local unikernel builds.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(1800);

/// Production `CommandRunner` over `tokio::process`.
///
/// The child is killed when the timeout fires and when the returned future
/// is dropped, so a cancelled `ssh` never outlives its caller.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let mut command = Command::new(program);
        command.args(args);
        collect_output(spawn_piped(&mut command, program)?, program, timeout).await
    }

    async fn run_with_options(
        &self,
        program: &str,
        args: &[&str],
        options: &ProcessOptions,
    ) -> Result<Output> {
        let mut command = Command::new(program);
        command.args(args);
        command.envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &options.current_dir {
            command.current_dir(dir);
        }
        let timeout = options.timeout.unwrap_or(self.timeout);
        collect_output(spawn_piped(&mut command, program)?, program, timeout).await
    }
}

fn spawn_piped(command: &mut Command, program: &str) -> Result<Child> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))
}

async fn collect_output(mut child: Child, program: &str, timeout: Duration) -> Result<Output> {
    let mut stdout_handle = child.stdout.take();
    let mut stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stdout_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stderr_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
            );
            Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            })
        } => result,
        () = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
        }
    }
}
