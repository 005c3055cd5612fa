//! Show-wide schedule options persisted alongside the playlists

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Operator button bound to a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonDef {
    pub label: String,
    pub command: String,
    #[serde(default)]
    pub parameters: String,
}

impl ButtonDef {
    pub fn new(
        label: impl Into<String>,
        command: impl Into<String>,
        parameters: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            parameters: parameters.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// Push an all-zero frame on ticks where nothing is playing
    #[serde(default = "default_true")]
    send_off_when_idle: bool,

    #[serde(default, rename = "button")]
    buttons: Vec<ButtonDef>,

    #[serde(skip)]
    dirty: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            send_off_when_idle: true,
            buttons: Vec::new(),
            dirty: false,
        }
    }
}

impl ScheduleOptions {
    pub fn send_off_when_idle(&self) -> bool {
        self.send_off_when_idle
    }

    pub fn set_send_off_when_idle(&mut self, enabled: bool) {
        if self.send_off_when_idle != enabled {
            self.send_off_when_idle = enabled;
            self.dirty = true;
        }
    }

    pub fn buttons(&self) -> &[ButtonDef] {
        &self.buttons
    }

    pub fn button(&self, label: &str) -> Option<&ButtonDef> {
        self.buttons.iter().find(|b| b.label == label)
    }

    /// Add a button, replacing any existing button with the same label
    pub fn add_button(&mut self, button: ButtonDef) {
        match self.buttons.iter_mut().find(|b| b.label == button.label) {
            Some(existing) => *existing = button,
            None => self.buttons.push(button),
        }
        self.dirty = true;
    }

    pub fn remove_button(&mut self, label: &str) -> bool {
        let before = self.buttons.len();
        self.buttons.retain(|b| b.label != label);
        let removed = self.buttons.len() != before;
        self.dirty |= removed;
        removed
    }

    /// `{"buttons":[{"label":...}, ...]}`
    pub fn buttons_json(&self) -> Value {
        let buttons: Vec<Value> = self
            .buttons
            .iter()
            .map(|b| json!({ "label": b.label }))
            .collect();
        json!({ "buttons": buttons })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
