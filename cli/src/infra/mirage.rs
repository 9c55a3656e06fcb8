//! Infrastructure implementation of the `ArtifactBuilder` port.
//!
//! Runs `mirage configure` and `make` in the unikernel source directory.
//! Only the exit status is interpreted.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{ArtifactBuilder, BuildTarget, CommandRunner, ProcessOptions};
use crate::infra::command_runner::{DEFAULT_BUILD_TIMEOUT, TokioCommandRunner};

/// Builds unikernels with the `mirage` tool.
pub struct MirageBuilder<R: CommandRunner> {
    runner: R,
    timeout: Duration,
}

impl<R: CommandRunner> MirageBuilder<R> {
    pub fn new(runner: R, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// The underlying command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn step(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        source_dir: &Path,
    ) -> Result<()> {
        let options = ProcessOptions {
            env: env
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            current_dir: Some(source_dir.to_path_buf()),
            timeout: Some(self.timeout),
        };
        let label = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!(command = %label, dir = %source_dir.display(), "build step");
        let output = self
            .runner
            .run_with_options(program, args, &options)
            .await
            .with_context(|| format!("{label} failed to run"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{label} failed ({}): {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "terminated".to_string(), |c| format!("exit code {c}")),
                stderr.trim()
            );
        }
        Ok(())
    }
}

impl MirageBuilder<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner() -> Self {
        Self::new(
            TokioCommandRunner::new(DEFAULT_BUILD_TIMEOUT),
            DEFAULT_BUILD_TIMEOUT,
        )
    }
}

/// `mirage configure` flag and environment for a target.
#[must_use]
pub fn configure_invocation(target: BuildTarget) -> (&'static str, &'static [(&'static str, &'static str)]) {
    match target {
        BuildTarget::Xen => ("--xen", &[("DHCP", "true"), ("FS", "crunch")]),
        BuildTarget::Unix => ("--unix", &[("NET", "socket"), ("FS", "crunch")]),
    }
}

impl<R: CommandRunner> ArtifactBuilder for MirageBuilder<R> {
    async fn build(&self, source_dir: &Path, target: BuildTarget) -> Result<()> {
        anyhow::ensure!(
            source_dir.is_dir(),
            "source directory {} does not exist",
            source_dir.display()
        );
        let (flag, env) = configure_invocation(target);
        self.step("mirage", &["configure", flag], env, source_dir)
            .await?;
        self.step("make", &[], &[], source_dir).await
    }
}
