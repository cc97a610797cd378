//! Configuration management for tidal-bridge.

pub mod paths;
pub mod settings;

pub use paths::config_file;
pub use settings::TidalConfig;

use std::path::Path;

use crate::error::{Result, TidalError};

/// Load configuration from the default config file.
///
/// If the config file doesn't exist, returns default configuration.
pub fn load_config() -> Result<TidalConfig> {
    let path = config_file()?;
    load_config_from(&path)
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns default configuration.
pub fn load_config_from(path: &Path) -> Result<TidalConfig> {
    if !path.exists() {
        return Ok(TidalConfig::default().with_env_overrides());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: TidalConfig = toml::from_str(&contents)
        .map_err(|e| TidalError::Config(format!("{}: {e}", path.display())))?;

    Ok(config.with_env_overrides())
}
