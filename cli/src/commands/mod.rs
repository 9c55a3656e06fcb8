//! Command implementations

pub mod build;
pub mod compile;
pub mod config;
pub mod launch;
pub mod version;

use clap::Args;

use crate::domain::validate::validate_region;
use crate::infra::aws::{AwsCli, Credentials};
use crate::infra::command_runner::TokioCommandRunner;

/// Region and credentials shared by every command that talks to the cloud.
#[derive(Args, Debug, Clone)]
pub struct CloudArgs {
    /// Region to operate in
    #[arg(long, env = "AWS_DEFAULT_REGION", default_value = "eu-west-1")]
    pub region: String,

    /// Access key id (falls back to the aws CLI's own credential chain)
    #[arg(
        long,
        env = "AWS_ACCESS_KEY_ID",
        hide_env_values = true,
        requires = "secret_key"
    )]
    pub access_key: Option<String>,

    /// Secret access key
    #[arg(
        long,
        env = "AWS_SECRET_ACCESS_KEY",
        hide_env_values = true,
        requires = "access_key"
    )]
    pub secret_key: Option<String>,
}

impl CloudArgs {
    /// Explicit credentials. Clap only accepts both halves together.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.access_key, &self.secret_key) {
            (Some(id), Some(secret)) => Some(Credentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
            }),
            _ => None,
        }
    }

    /// Validate the region and build the cloud adapter for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the region name is malformed.
    pub fn client(&self) -> anyhow::Result<AwsCli<TokioCommandRunner>> {
        validate_region(&self.region)?;
        Ok(AwsCli::default_runner(&self.region, self.credentials()))
    }
}

/// Stable error code for a command error in `--json` mode.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<crate::domain::ConfigError>().is_some() {
        "config_error"
    } else if err.downcast_ref::<crate::domain::ProviderError>().is_some() {
        "provider_error"
    } else {
        "error"
    }
}
