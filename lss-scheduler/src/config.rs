//! Bootstrap configuration for the scheduler service
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--show-dir`, `--port`)
//! 2. Environment variables (`LSS_SHOW_DIR`, `LSS_PORT`)
//! 3. TOML configuration file (`--config` / `LSS_CONFIG` / platform default)
//! 4. Built-in defaults
//!
//! Everything here is read once at startup. Playlists, buttons and the
//! idle-blanking option live in the show folder's schedule file instead.

use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest accepted frame interval
pub const MIN_FRAME_INTERVAL_MS: u64 = 10;
/// Longest accepted frame interval
pub const MAX_FRAME_INTERVAL_MS: u64 = 1000;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Folder holding `schedule.toml` and the `stash/` data folder
    #[serde(default)]
    pub show_dir: Option<PathBuf>,

    /// HTTP control port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Frame pump period
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Write unsaved schedule changes on shutdown
    #[serde(default = "default_true")]
    pub save_on_exit: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Channel output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Size of the frame buffer
    #[serde(default = "default_total_channels")]
    pub total_channels: usize,

    /// Frames allowed to wait for the network worker before new ones are dropped
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Controllers receiving slices of the frame; none means output is discarded
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
}

/// One networked lighting controller
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControllerConfig {
    /// `host:port`
    pub address: String,

    /// First channel (0-based) sent to this controller
    #[serde(default)]
    pub start_channel: usize,

    pub channels: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_frame_interval_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_total_channels() -> usize {
    512
}

fn default_queue_depth() -> usize {
    2
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            show_dir: None,
            port: default_port(),
            frame_interval_ms: default_frame_interval_ms(),
            save_on_exit: true,
            logging: LoggingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            total_channels: default_total_channels(),
            queue_depth: default_queue_depth(),
            controllers: Vec::new(),
        }
    }
}

impl TomlConfig {
    /// Resolve and read the config file; absent file yields defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = lss_common::config::resolve_config_path(cli_path);
        Ok(lss_common::config::load_toml_or_default(path.as_deref())?)
    }

    /// Frame pump period, clamped to the supported range
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(
            self.frame_interval_ms
                .clamp(MIN_FRAME_INTERVAL_MS, MAX_FRAME_INTERVAL_MS),
        )
    }

    /// Show folder: CLI/env value, then TOML, then the platform default
    pub fn resolve_show_dir(&self, cli_value: Option<PathBuf>) -> PathBuf {
        cli_value
            .or_else(|| self.show_dir.clone())
            .unwrap_or_else(lss_common::config::default_show_dir)
    }

    /// HTTP port: CLI/env value, then TOML (which carries the default)
    pub fn resolve_port(&self, cli_value: Option<u16>) -> u16 {
        cli_value.unwrap_or(self.port)
    }
}
