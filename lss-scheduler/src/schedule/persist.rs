//! Schedule file (`schedule.toml`) load and save
//!
//! The file holds the ordered playlists with their steps plus the schedule
//! options. Runtime state (positions, running flags) is never written.

use super::options::ScheduleOptions;
use super::window::ScheduleWindow;
use crate::error::Result;
use crate::playlist::step::{DEFAULT_FRAME_MS, DEFAULT_RENDERER};
use crate::playlist::{Playlist, PlaylistStep};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Schedule file name inside the show folder
pub const SCHEDULE_FILE: &str = "schedule.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFile {
    #[serde(default)]
    pub options: ScheduleOptions,

    #[serde(default, rename = "playlist")]
    pub playlists: Vec<PlaylistRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub looping: bool,
    #[serde(default)]
    pub random: bool,
    #[serde(default)]
    pub first_once: bool,
    #[serde(default)]
    pub last_once: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleWindow>,
    #[serde(default, rename = "step")]
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub length_ms: u64,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,
    #[serde(default = "default_renderer")]
    pub renderer: String,
    #[serde(default)]
    pub looping: bool,
}

fn default_frame_ms() -> u32 {
    DEFAULT_FRAME_MS
}

fn default_renderer() -> String {
    DEFAULT_RENDERER.to_string()
}

impl From<&Playlist> for PlaylistRecord {
    fn from(playlist: &Playlist) -> Self {
        Self {
            name: playlist.name().to_string(),
            priority: playlist.priority(),
            looping: playlist.default_looping(),
            random: playlist.is_random(),
            first_once: playlist.first_once(),
            last_once: playlist.last_once(),
            schedule: playlist.schedule().cloned(),
            steps: playlist
                .steps()
                .iter()
                .map(|step| StepRecord {
                    name: step.name().to_string(),
                    length_ms: step.length_ms(),
                    frame_ms: step.frame_ms(),
                    renderer: step.renderer().to_string(),
                    looping: step.is_looping(),
                })
                .collect(),
        }
    }
}

impl From<PlaylistRecord> for Playlist {
    fn from(record: PlaylistRecord) -> Self {
        let mut playlist = Playlist::new(record.name)
            .with_priority(record.priority)
            .with_looping(record.looping)
            .with_random(record.random)
            .with_play_once(record.first_once, record.last_once);

        if let Some(window) = record.schedule {
            playlist = playlist.with_schedule(window);
        }

        for step in record.steps {
            let mut built = PlaylistStep::new(step.name, step.length_ms)
                .with_frame_ms(step.frame_ms)
                .with_renderer(step.renderer);
            built.set_looping(step.looping);
            playlist = playlist.with_step(built);
        }
        playlist
    }
}

/// Read and parse a schedule file
pub fn load(path: &Path) -> Result<ScheduleFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Read a schedule file; a missing or unreadable file yields an empty schedule
pub fn load_or_default(path: &Path) -> ScheduleFile {
    if !path.exists() {
        info!("No schedule at {}, starting empty", path.display());
        return ScheduleFile::default();
    }

    match load(path) {
        Ok(file) => {
            info!(
                "Loaded {} playlist(s) from {}",
                file.playlists.len(),
                path.display()
            );
            file
        }
        Err(e) => {
            warn!(
                "Failed to load schedule {}: {}; starting empty",
                path.display(),
                e
            );
            ScheduleFile::default()
        }
    }
}

/// Write atomically: temp file in the same folder, then rename over `path`
pub fn save(path: &Path, file: &ScheduleFile) -> Result<()> {
    let text = toml::to_string_pretty(file)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
