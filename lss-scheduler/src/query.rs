//! Read-only status queries
//!
//! Every answer is computed from live scheduler state at call time.

use crate::command::CommandInterpreter;
use crate::error::{Error, Result};
use crate::schedule::Scheduler;
use lss_common::human_time::format_show_time;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Query answer: success flag, failure message and structured payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub success: bool,
    pub message: String,
    pub data: Value,
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub struct QueryInterface {
    scheduler: Arc<Scheduler>,
}

impl QueryInterface {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    pub fn execute(&self, query: &str, parameters: &str) -> QueryOutcome {
        debug!("Query '{}' ({})", query, parameters);
        match self.answer(query, parameters) {
            Ok(data) => QueryOutcome {
                success: true,
                message: String::new(),
                data,
            },
            Err((e, empty)) => QueryOutcome {
                success: false,
                message: e.to_string(),
                data: empty,
            },
        }
    }

    /// On failure also returns the empty payload for that query
    fn answer(&self, query: &str, parameters: &str) -> std::result::Result<Value, (Error, Value)> {
        match query {
            "GetPlayLists" => Ok(self.playlists()),
            "GetPlayListSteps" => self
                .playlist_steps(parameters)
                .map_err(|e| (e, json!({ "steps": [] }))),
            "GetPlayingStatus" => Ok(self.playing_status()),
            "GetButtons" => Ok(self.scheduler.buttons_json()),
            "GetCommands" => Ok(json!({
                "commands": CommandInterpreter::commands().collect::<Vec<_>>()
            })),
            _ => Err((Error::UnknownQuery, json!({}))),
        }
    }

    fn playlists(&self) -> Value {
        let playlists: Vec<Value> = self
            .scheduler
            .playlist_lengths()
            .into_iter()
            .map(|(name, length)| json!({ "name": name, "length": format_show_time(length) }))
            .collect();
        json!({ "playlists": playlists })
    }

    fn playlist_steps(&self, name: &str) -> Result<Value> {
        let steps: Vec<Value> = self
            .scheduler
            .playlist_steps(name)?
            .into_iter()
            .map(|(step, length)| json!({ "name": step, "length": format_show_time(length) }))
            .collect();
        Ok(json!({ "steps": steps }))
    }

    fn playing_status(&self) -> Value {
        let volume = self.scheduler.volume();
        let Some(status) = self.scheduler.active_status() else {
            return json!({ "status": "idle", "volume": volume.to_string() });
        };

        json!({
            "status": if status.paused { "paused" } else { "playing" },
            "playlist": status.playlist,
            "looping": flag(status.looping),
            "random": flag(status.random),
            "step": status.step,
            "steplooping": flag(status.step_looping),
            "length": format_show_time(status.length_ms),
            "position": format_show_time(status.position_ms),
            "left": format_show_time(status.length_ms.saturating_sub(status.position_ms)),
            "volume": volume.to_string(),
        })
    }
}
