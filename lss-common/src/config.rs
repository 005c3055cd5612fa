//! Bootstrap configuration file resolution
//!
//! Resolution order for the config file path:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`LSS_CONFIG`)
//! 3. OS-dependent default location, if the file exists
//!
//! A missing config file is never fatal: callers get compiled defaults and a
//! warning. A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the bootstrap config file
pub const CONFIG_ENV_VAR: &str = "LSS_CONFIG";

/// Resolve which config file to read, if any.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform default, only when present
    default_config_path().filter(|p| p.exists())
}

/// Platform config file location (`<config_dir>/lss/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    if cfg!(target_os = "linux") {
        let user_config = dirs::config_dir().map(|d| d.join("lss").join("config.toml"));
        match user_config {
            Some(path) if path.exists() => Some(path),
            _ => Some(PathBuf::from("/etc/lss/config.toml")),
        }
    } else {
        dirs::config_dir().map(|d| d.join("lss").join("config.toml"))
    }
}

/// OS-dependent default show folder
pub fn default_show_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lss"))
        .unwrap_or_else(|| PathBuf::from("./lss_show"))
}

/// Load a TOML document, falling back to `T::default()` when the file is absent.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using compiled defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(value)
}
