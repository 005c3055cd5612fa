//! Remote control command interpreter
//!
//! Commands are looked up by exact name in a table mapping to [`Command`],
//! then executed against the [`Scheduler`]. Parameters arrive as one string;
//! two-field commands split it on `,` and reject any other field count before
//! touching the scheduler. Every failure is returned as a message, never
//! raised into the caller.

use crate::error::{Error, PlaylistError, Result};
use crate::schedule::{PlayRequest, Scheduler};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Every command the interpreter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    StopAllNow,
    PlaySelected,
    PlaySelectedLooped,
    PlaySpecified,
    PlaySpecifiedLooped,
    StopSpecified,
    StopSpecifiedAtEndOfStep,
    StopSpecifiedAtEndOfLoop,
    StopAtEndOfStep,
    StopAtEndOfLoop,
    JumpToEndSteps,
    Pause,
    NextStep,
    RestartStep,
    PriorStep,
    RandomStepCurrent,
    RandomStepSpecified,
    JumpToStepCurrent,
    PlayStartingAtStep,
    PlayStartingAtStepLooped,
    ToggleLoopCurrentStep,
    PlayStepLooped,
    PlayStepOnce,
    ExtendSchedule,
    SetVolume,
    AdjustVolume,
    SaveSchedule,
    ToggleOutput,
    ToggleRandom,
    ToggleLoop,
    PressButton,
}

/// Protocol names, in the order `GetCommands` reports them
const COMMAND_TABLE: &[(&str, Command)] = &[
    ("Stop all now", Command::StopAllNow),
    ("Play selected playlist", Command::PlaySelected),
    ("Play selected playlist looped", Command::PlaySelectedLooped),
    ("Play specified playlist", Command::PlaySpecified),
    ("Play specified playlist looped", Command::PlaySpecifiedLooped),
    ("Stop specified playlist", Command::StopSpecified),
    (
        "Stop specified playlist at end of current step",
        Command::StopSpecifiedAtEndOfStep,
    ),
    (
        "Stop specified playlist at end of current loop",
        Command::StopSpecifiedAtEndOfLoop,
    ),
    ("Stop playlist at end of current step", Command::StopAtEndOfStep),
    ("Stop playlist at end of current loop", Command::StopAtEndOfLoop),
    (
        "Jump to play once at end steps at end of current step and then stop",
        Command::JumpToEndSteps,
    ),
    ("Pause", Command::Pause),
    ("Next step in current playlist", Command::NextStep),
    ("Restart step in current playlist", Command::RestartStep),
    ("Prior step in current playlist", Command::PriorStep),
    ("Jump to random step in current playlist", Command::RandomStepCurrent),
    ("Jump to random step in specified playlist", Command::RandomStepSpecified),
    ("Jump to specified step in current playlist", Command::JumpToStepCurrent),
    ("Play playlist starting at step", Command::PlayStartingAtStep),
    ("Play playlist starting at step looped", Command::PlayStartingAtStepLooped),
    ("Toggle loop current step", Command::ToggleLoopCurrentStep),
    (
        "Play specified step in specified playlist looped",
        Command::PlayStepLooped,
    ),
    ("Play specified playlist step once only", Command::PlayStepOnce),
    ("Add to the specified schedule n minutes", Command::ExtendSchedule),
    ("Set volume to", Command::SetVolume),
    ("Adjust volume by", Command::AdjustVolume),
    ("Save schedule", Command::SaveSchedule),
    ("Toggle output to lights", Command::ToggleOutput),
    ("Toggle current playlist random", Command::ToggleRandom),
    ("Toggle current playlist loop", Command::ToggleLoop),
    ("PressButton", Command::PressButton),
];

/// Result of one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
    /// Preferred frame interval hint (ms), when the command produces one
    pub rate: Option<u32>,
}

impl CommandOutcome {
    fn ok(rate: Option<u32>) -> Self {
        Self {
            success: true,
            message: String::new(),
            rate,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            rate: None,
        }
    }
}

/// Split `playlist,step` style parameters into exactly two fields
fn two_params(parameters: &str) -> Result<(&str, &str)> {
    let mut fields = parameters.split(',');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(first), Some(second), None) => Ok((first, second)),
        _ => Err(Error::InvalidParameters),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::InvalidParameters)
}

/// Command name → scheduler operation
pub struct CommandInterpreter {
    scheduler: Arc<Scheduler>,
    table: HashMap<&'static str, Command>,
}

impl CommandInterpreter {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            table: COMMAND_TABLE.iter().copied().collect(),
        }
    }

    /// Command names in protocol order
    pub fn commands() -> impl Iterator<Item = &'static str> {
        COMMAND_TABLE.iter().map(|(name, _)| *name)
    }

    pub fn lookup(&self, name: &str) -> Option<Command> {
        self.table.get(name).copied()
    }

    /// Run `command` with its comma-separated `parameters`.
    ///
    /// `selected` is the caller's currently selected playlist, used by the
    /// "selected playlist" commands.
    pub fn execute(&self, command: &str, parameters: &str, selected: Option<&str>) -> CommandOutcome {
        debug!("Command '{}' ({})", command, parameters);
        match self.dispatch(command, parameters, selected, 0) {
            Ok(rate) => CommandOutcome::ok(rate),
            Err(e) => {
                let message = e.to_string();
                warn!("Action failed: {}", message);
                CommandOutcome::failed(message)
            }
        }
    }

    fn dispatch(
        &self,
        name: &str,
        parameters: &str,
        selected: Option<&str>,
        depth: u32,
    ) -> Result<Option<u32>> {
        let command = self.lookup(name).ok_or(Error::UnknownCommand)?;
        let scheduler = &self.scheduler;

        let rate = match command {
            Command::StopAllNow => {
                scheduler.stop_all();
                None
            }
            Command::PlaySelected | Command::PlaySelectedLooped => {
                let playlist = selected.ok_or(Error::NoPlaylistSelected)?;
                let request = PlayRequest {
                    looping: command == Command::PlaySelectedLooped,
                    ..PlayRequest::default()
                };
                Some(scheduler.play_playlist(playlist, request)?)
            }
            Command::PlaySpecified | Command::PlaySpecifiedLooped => {
                let request = PlayRequest {
                    looping: command == Command::PlaySpecifiedLooped,
                    ..PlayRequest::default()
                };
                Some(scheduler.play_playlist(parameters, request)?)
            }
            Command::StopSpecified => {
                scheduler.stop_playlist(parameters)?;
                None
            }
            Command::StopSpecifiedAtEndOfStep => {
                scheduler.stop_playlist_deferred(parameters, false)?;
                None
            }
            Command::StopSpecifiedAtEndOfLoop => {
                scheduler.stop_playlist_deferred(parameters, true)?;
                None
            }
            Command::StopAtEndOfStep => {
                scheduler.with_active(|p| p.stop_at_end_of_current_step())?;
                None
            }
            Command::StopAtEndOfLoop => {
                scheduler.with_active(|p| p.stop_at_end_of_this_loop())?;
                None
            }
            Command::JumpToEndSteps => {
                scheduler
                    .with_active(|p| p.jump_to_end_steps_at_end_of_current_step())
                    .map_err(|e| match e {
                        Error::NoActivePlaylist => Error::NoPlaylistRunning,
                        other => other,
                    })?;
                None
            }
            Command::Pause => {
                let paused = scheduler.with_active(|p| p.toggle_pause())?;
                info!("Playback {}", if paused { "paused" } else { "resumed" });
                None
            }
            Command::NextStep => Some(scheduler.with_active(|p| p.jump_to_next_step())??),
            Command::PriorStep => Some(scheduler.with_active(|p| p.jump_to_prior_step())??),
            Command::RestartStep => {
                scheduler.with_active(|p| p.restart_current_step())??;
                None
            }
            Command::RandomStepCurrent => Some(scheduler.with_active(
                |p| -> std::result::Result<u32, PlaylistError> {
                    let step = p
                        .random_step()
                        .map(|s| s.name().to_string())
                        .ok_or(PlaylistError::NoSteps)?;
                    p.jump_to_step(&step)
                },
            )??),
            Command::RandomStepSpecified => {
                let request = PlayRequest {
                    random_step: true,
                    ..PlayRequest::default()
                };
                Some(scheduler.play_playlist(parameters, request)?)
            }
            Command::JumpToStepCurrent => {
                Some(scheduler.with_active(|p| p.jump_to_step(parameters))??)
            }
            Command::PlayStartingAtStep | Command::PlayStartingAtStepLooped => {
                let (playlist, step) = two_params(parameters)?;
                let request = PlayRequest {
                    looping: command == Command::PlayStartingAtStepLooped,
                    start_step: Some(step),
                    ..PlayRequest::default()
                };
                Some(scheduler.play_playlist(playlist, request)?)
            }
            Command::ToggleLoopCurrentStep => {
                scheduler.with_active(|p| -> std::result::Result<(), PlaylistError> {
                    if p.is_step_looping() {
                        p.clear_step_looping();
                        return Ok(());
                    }
                    let step = p
                        .current_step()
                        .map(|s| s.name().to_string())
                        .ok_or(PlaylistError::NotRunning)?;
                    p.loop_step(&step)
                })??;
                None
            }
            Command::PlayStepLooped => {
                let (playlist, step) = two_params(parameters)?;
                let request = PlayRequest {
                    start_step: Some(step),
                    loop_start_step: true,
                    ..PlayRequest::default()
                };
                Some(scheduler.play_playlist(playlist, request)?)
            }
            Command::PlayStepOnce => {
                let (playlist, step) = two_params(parameters)?;
                let request = PlayRequest {
                    start_step: Some(step),
                    stop_after_step: true,
                    ..PlayRequest::default()
                };
                Some(scheduler.play_playlist(playlist, request)?)
            }
            Command::ExtendSchedule => {
                let (playlist, minutes) = two_params(parameters)?;
                let minutes = parse_number::<u32>(minutes)?;
                scheduler.extend_schedule(playlist, minutes)?;
                None
            }
            Command::SetVolume => {
                scheduler.set_volume(parse_number(parameters)?);
                None
            }
            Command::AdjustVolume => {
                scheduler.adjust_volume(parse_number(parameters)?);
                None
            }
            Command::SaveSchedule => {
                scheduler.save()?;
                None
            }
            Command::ToggleOutput => {
                scheduler.toggle_output()?;
                None
            }
            Command::ToggleRandom => {
                scheduler.with_active(|p| p.set_random(!p.is_random()))?;
                None
            }
            Command::ToggleLoop => {
                scheduler.with_active(|p| p.set_loop_playback(!p.is_looping()))?;
                None
            }
            Command::PressButton => {
                // Buttons may not press other buttons
                if depth > 0 {
                    return Err(Error::UnknownCommand);
                }
                let button = scheduler
                    .button(parameters)
                    .ok_or_else(|| Error::ButtonNotFound(parameters.to_string()))?;
                debug!("Button '{}' → '{}'", button.label, button.command);
                self.dispatch(&button.command, &button.parameters, selected, depth + 1)?
            }
        };

        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_name_once() {
        let names: Vec<_> = CommandInterpreter::commands().collect();
        assert_eq!(names.len(), COMMAND_TABLE.len());
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names[0], "Stop all now");
        assert_eq!(names.last(), Some(&"PressButton"));
    }

    #[test]
    fn test_two_params() {
        assert_eq!(two_params("Holiday,Intro").unwrap(), ("Holiday", "Intro"));
        assert_eq!(two_params("Holiday,").unwrap(), ("Holiday", ""));
        assert!(matches!(two_params("Holiday"), Err(Error::InvalidParameters)));
        assert!(matches!(two_params("a,b,c"), Err(Error::InvalidParameters)));
    }

    #[test]
    fn test_parse_number_accepts_sign() {
        assert_eq!(parse_number::<i64>("+10").unwrap(), 10);
        assert_eq!(parse_number::<i64>(" -5 ").unwrap(), -5);
        assert!(parse_number::<i64>("loud").is_err());
    }
}
