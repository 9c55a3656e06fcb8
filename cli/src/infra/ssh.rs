//! Infrastructure implementation of the `RemoteShell` port over OpenSSH.
//!
//! `SshShell<R>` routes `ssh` and `scp` through a `CommandRunner`, so a
//! cancelled command kills the local client and drops the session.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, RemoteShell};
use crate::domain::staging::shell_quote;
use crate::infra::command_runner::{DEFAULT_REMOTE_TIMEOUT, TokioCommandRunner};

/// Connection settings for the build host.
#[derive(Debug, Clone)]
pub struct SshSettings {
    pub user: String,
    pub identity: PathBuf,
    pub connection_attempts: u32,
    pub connect_timeout_secs: u64,
}

/// Infrastructure adapter that runs remote commands through `ssh`/`scp`.
pub struct SshShell<R: CommandRunner> {
    runner: R,
    settings: SshSettings,
}

impl<R: CommandRunner> SshShell<R> {
    pub fn new(runner: R, settings: SshSettings) -> Self {
        Self { runner, settings }
    }

    /// The underlying command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Options shared by `ssh` and `scp`.
    fn common_args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.settings.identity.display().to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectionAttempts={}", self.settings.connection_attempts),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.settings.connect_timeout_secs),
        ]
    }

    async fn ssh(&self, host: &str, command: &str) -> Result<Output> {
        let target = format!("{}@{host}", self.settings.user);
        let mut args = self.common_args();
        args.push(target);
        args.push("--".to_string());
        args.push(command.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run("ssh", &args)
            .await
            .with_context(|| format!("ssh {host}"))
    }
}

impl SshShell<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner(settings: SshSettings) -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_REMOTE_TIMEOUT), settings)
    }
}

impl<R: CommandRunner> RemoteShell for SshShell<R> {
    async fn run(&self, host: &str, command: &str) -> Result<Output> {
        self.ssh(host, command).await
    }

    async fn run_privileged(&self, host: &str, command: &str) -> Result<Output> {
        self.ssh(host, &format!("sudo -n sh -c {}", shell_quote(command)))
            .await
    }

    async fn upload(&self, host: &str, local: &Path, remote: &str) -> Result<Output> {
        let target = format!("{}@{host}:{remote}", self.settings.user);
        let local = local.display().to_string();
        let mut args = self.common_args();
        args.push("-q".to_string());
        args.push(local);
        args.push(target);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run("scp", &args)
            .await
            .with_context(|| format!("scp to {host}"))
    }
}

/// Expand a leading `~/` against the home directory.
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
