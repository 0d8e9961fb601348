//! XDG-style locations for the global config file and default data files.

use crate::error::ApiError;
use std::path::PathBuf;

const APP_DIR: &str = "syllabus";

/// `$XDG_CONFIG_HOME`, else `~/.config`, else the platform config directory.
pub fn config_home() -> Result<PathBuf, ApiError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home).join(".config"));
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| ApiError::ConfigError("Cannot determine config directory".to_string()))
}

/// `$XDG_DATA_HOME`, else `~/.local/share`, else the platform data directory.
pub fn data_home() -> Result<PathBuf, ApiError> {
    if let Some(dir) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home).join(".local").join("share"));
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| ApiError::ConfigError("Cannot determine data directory".to_string()))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_home()
        .ok()
        .map(|dir| dir.join(APP_DIR).join("config.toml"))
}

pub fn default_log_path() -> Result<PathBuf, ApiError> {
    Ok(data_home()?.join(APP_DIR).join("syllabus.log"))
}
