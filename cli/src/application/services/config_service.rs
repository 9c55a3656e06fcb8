//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{BakeConfig, apply_config_value};

/// Load configuration.
pub fn load_config(store: &impl ConfigStore) -> Result<BakeConfig> {
    store.load()
}

/// Set one key, validate it, and persist the result. Returns the new config.
pub fn set_config_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<BakeConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config)?;
    Ok(config)
}
