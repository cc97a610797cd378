//! Platform-specific path utilities for tidal-bridge.

use std::path::PathBuf;

use crate::error::{Result, TidalError};

/// Get the configuration directory for tidal-bridge.
///
/// - Linux: `~/.config/tidal-bridge`
/// - macOS: `~/Library/Application Support/tidal-bridge`
/// - Windows: `%APPDATA%\tidal-bridge`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| TidalError::Config("Cannot determine config directory".to_string()))?;
    Ok(base.join("tidal-bridge"))
}

/// Get the main configuration file path.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
