//! Platform-specific configuration paths.

use crate::constants::{APP_NAME, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/geochip/`
/// - macOS: `~/Library/Application Support/geochip/`
/// - Windows: `%APPDATA%\geochip\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the config file.
///
/// `GEOCHIP_CONFIG` replaces the platform location when set and non-empty.
pub fn config_file_path() -> Result<PathBuf> {
    config_file_override(std::env::var_os(CONFIG_ENV_VAR)).map_or_else(
        || Ok(config_dir()?.join(CONFIG_FILE_NAME)),
        Ok,
    )
}

fn config_file_override(value: Option<std::ffi::OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}
