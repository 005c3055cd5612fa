//! Playlist step sequencing state machine
//!
//! A playlist is an ordered sequence of steps plus playback modifiers. While
//! running, exactly one step is current and its index is always valid.
//!
//! Stop requests come in two tiers: [`Playlist::stop`] is immediate, while
//! [`Playlist::stop_at_end_of_current_step`] and
//! [`Playlist::stop_at_end_of_this_loop`] only take effect when `advance`
//! reaches the matching boundary, so output is never cut off mid-step.
//!
//! The stored `looping` flags (playlist and step) are part of the saved
//! definition. How a run loops is runtime state seeded by [`Playlist::start`]
//! and discarded when the run ends.

pub mod step;

pub use step::{PlaylistStep, DEFAULT_FRAME_MS};

use crate::error::PlaylistError;
use crate::render::StepFrame;
use crate::schedule::window::ScheduleWindow;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

/// Deferred stop condition consulted by `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingStop {
    #[default]
    None,
    /// Become idle when the current step ends
    AtEndOfStep,
    /// Become idle when the current pass through the steps ends
    AtEndOfLoop,
    /// Play the play-once end step after the current step, then become idle
    AfterEndSteps,
}

/// Externally visible playback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    Idle,
    Running,
    Paused,
    StoppingAtStepEnd,
    StoppingAtLoopEnd,
}

/// Result of one `advance` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvanceOutcome {
    /// Playlist ran out of steps (or hit its pending stop) and is now idle
    pub completed: bool,
    /// Current step index changed during this advance
    pub step_changed: bool,
}

/// Named, prioritized, ordered sequence of steps
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Instance identity; overrides get a fresh id when cloned
    id: Uuid,
    name: String,
    steps: Vec<PlaylistStep>,
    priority: i32,
    looping: bool,
    random: bool,
    /// First step plays once at start and is skipped on later loops
    first_once: bool,
    /// Last step plays once when the playlist ends
    last_once: bool,
    schedule: Option<ScheduleWindow>,

    running: bool,
    /// Loop mode of the current run
    play_looping: bool,
    /// Step repeating itself in the current run
    looping_step: Option<usize>,
    paused: bool,
    pending_stop: PendingStop,
    current: Option<usize>,
    /// Loop-body steps played since the current loop began (random mode)
    loop_steps_played: usize,
    loops_completed: u32,

    dirty: bool,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            steps: Vec::new(),
            priority: 0,
            looping: false,
            random: false,
            first_once: false,
            last_once: false,
            schedule: None,
            running: false,
            play_looping: false,
            looping_step: None,
            paused: false,
            pending_stop: PendingStop::None,
            current: None,
            loop_steps_played: 0,
            loops_completed: 0,
            dirty: false,
        }
    }

    pub fn with_step(mut self, step: PlaylistStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_random(mut self, random: bool) -> Self {
        self.random = random;
        self
    }

    pub fn with_play_once(mut self, first_once: bool, last_once: bool) -> Self {
        self.first_once = first_once;
        self.last_once = last_once;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleWindow) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Deep copy used for immediate overrides.
    ///
    /// The copy has its own identity and idle runtime state, so playing it
    /// never mutates the scheduled original.
    pub fn instantiate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy.schedule = None;
        copy.dirty = false;
        copy.reset_runtime();
        copy
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[PlaylistStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&PlaylistStep> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.running && self.paused
    }

    /// Loop mode of the current run, or the stored setting when idle
    pub fn is_looping(&self) -> bool {
        if self.running {
            self.play_looping
        } else {
            self.looping
        }
    }

    /// Stored looping setting, unaffected by how the current run started
    pub fn default_looping(&self) -> bool {
        self.looping
    }

    pub fn is_random(&self) -> bool {
        self.random
    }

    pub fn first_once(&self) -> bool {
        self.first_once
    }

    pub fn last_once(&self) -> bool {
        self.last_once
    }

    pub fn schedule(&self) -> Option<&ScheduleWindow> {
        self.schedule.as_ref()
    }

    pub fn pending_stop(&self) -> PendingStop {
        self.pending_stop
    }

    pub fn loops_completed(&self) -> u32 {
        self.loops_completed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_step(&self) -> Option<&PlaylistStep> {
        self.current.and_then(|i| self.steps.get(i))
    }

    /// Sum of all step lengths
    pub fn length_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.length_ms()).sum()
    }

    pub fn is_step_looping(&self) -> bool {
        self.current.is_some() && self.current == self.looping_step
    }

    pub fn phase(&self) -> PlaybackPhase {
        if !self.running {
            PlaybackPhase::Idle
        } else if self.paused {
            PlaybackPhase::Paused
        } else {
            match self.pending_stop {
                PendingStop::AtEndOfStep | PendingStop::AfterEndSteps => {
                    PlaybackPhase::StoppingAtStepEnd
                }
                PendingStop::AtEndOfLoop => PlaybackPhase::StoppingAtLoopEnd,
                PendingStop::None => PlaybackPhase::Running,
            }
        }
    }

    /// Snapshot of what the renderer needs for this frame
    pub fn current_frame(&self) -> Option<StepFrame> {
        if !self.running {
            return None;
        }
        self.current_step().map(|step| StepFrame {
            playlist: self.name.clone(),
            step: step.name().to_string(),
            renderer: step.renderer().to_string(),
            position_ms: step.position_ms(),
            length_ms: step.length_ms(),
        })
    }

    // ------------------------------------------------------------------
    // Editing (marks dirty)
    // ------------------------------------------------------------------

    pub fn add_step(&mut self, step: PlaylistStep) {
        self.steps.push(step);
        self.dirty = true;
    }

    pub fn set_priority(&mut self, priority: i32) {
        if self.priority != priority {
            self.priority = priority;
            self.dirty = true;
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        if self.looping != looping {
            self.looping = looping;
            self.dirty = true;
        }
    }

    /// Change how the current run loops without touching the stored setting
    pub fn set_loop_playback(&mut self, looping: bool) {
        if self.running {
            self.play_looping = looping;
        }
    }

    pub fn set_random(&mut self, random: bool) {
        if self.random != random {
            self.random = random;
            self.dirty = true;
        }
    }

    pub fn schedule_mut(&mut self) -> Option<&mut ScheduleWindow> {
        self.schedule.as_mut()
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Idle → Running, positioned at the first step (or a random one).
    pub fn start(&mut self, looping: bool) -> Result<(), PlaylistError> {
        if self.steps.is_empty() {
            return Err(PlaylistError::NoSteps);
        }

        self.reset_runtime();
        self.play_looping = looping;
        self.looping_step = self.steps.iter().position(|s| s.is_looping());
        self.running = true;
        let first = self.start_index();
        self.enter_step(first);
        Ok(())
    }

    /// Immediate stop: Running/Paused → Idle
    pub fn stop(&mut self) {
        self.reset_runtime();
    }

    pub fn pause(&mut self) {
        if self.running {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Flip pause state; returns whether the playlist is now paused
    pub fn toggle_pause(&mut self) -> bool {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
        self.is_paused()
    }

    pub fn stop_at_end_of_current_step(&mut self) {
        if self.running {
            self.pending_stop = PendingStop::AtEndOfStep;
        }
    }

    pub fn stop_at_end_of_this_loop(&mut self) {
        if self.running {
            self.pending_stop = PendingStop::AtEndOfLoop;
        }
    }

    /// At the end of the current step jump to the play-once end step, then stop
    pub fn jump_to_end_steps_at_end_of_current_step(&mut self) {
        if self.running {
            self.pending_stop = PendingStop::AfterEndSteps;
        }
    }

    /// Add `elapsed_ms` to the current step, carrying leftover time into the
    /// following steps. Zero elapsed time never changes state.
    pub fn advance(&mut self, elapsed_ms: u64) -> AdvanceOutcome {
        let mut outcome = AdvanceOutcome::default();
        if !self.running || self.paused || elapsed_ms == 0 {
            return outcome;
        }

        let mut remaining = elapsed_ms;
        // Bounds the carry loop when steps have zero length
        let mut transitions_left = self.steps.len() + 1;

        while let Some(index) = self.current {
            let Some(overflow) = self.steps[index].advance_by(remaining) else {
                break;
            };

            match self.next_after_step_end(index) {
                Some(next) => {
                    self.enter_step(next);
                    outcome.step_changed = true;
                    remaining = overflow;
                }
                None => {
                    self.reset_runtime();
                    outcome.completed = true;
                    outcome.step_changed = true;
                    return outcome;
                }
            }

            transitions_left -= 1;
            if remaining == 0 || transitions_left == 0 {
                break;
            }
        }

        outcome
    }

    /// Switch to the named step; returns its preferred frame interval.
    pub fn jump_to_step(&mut self, name: &str) -> Result<u32, PlaylistError> {
        if !self.running {
            return Err(PlaylistError::NotRunning);
        }
        let index = self
            .steps
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| PlaylistError::StepNotFound(name.to_string()))?;
        self.enter_step(index);
        Ok(self.steps[index].frame_ms())
    }

    /// Move to the following step, wrapping only when looping.
    ///
    /// At the last step of a non-looping playlist this stops the playlist.
    pub fn jump_to_next_step(&mut self) -> Result<u32, PlaylistError> {
        let index = self.current.filter(|_| self.running).ok_or(PlaylistError::NotRunning)?;
        let next = if index + 1 < self.steps.len() {
            Some(index + 1)
        } else if self.play_looping {
            Some(0)
        } else {
            None
        };

        match next {
            Some(next) => {
                self.enter_step(next);
                Ok(self.steps[next].frame_ms())
            }
            None => {
                self.stop();
                Ok(DEFAULT_FRAME_MS)
            }
        }
    }

    /// Move to the preceding step, wrapping only when looping.
    ///
    /// At the first step of a non-looping playlist this restarts the step.
    pub fn jump_to_prior_step(&mut self) -> Result<u32, PlaylistError> {
        let index = self.current.filter(|_| self.running).ok_or(PlaylistError::NotRunning)?;
        let prior = if index > 0 {
            index - 1
        } else if self.play_looping {
            self.steps.len() - 1
        } else {
            0
        };
        self.enter_step(prior);
        Ok(self.steps[prior].frame_ms())
    }

    pub fn restart_current_step(&mut self) -> Result<(), PlaylistError> {
        let index = self.current.filter(|_| self.running).ok_or(PlaylistError::NotRunning)?;
        self.steps[index].restart();
        Ok(())
    }

    /// Make `name` the only looping step of the current run
    pub fn loop_step(&mut self, name: &str) -> Result<(), PlaylistError> {
        let index = self
            .steps
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| PlaylistError::StepNotFound(name.to_string()))?;
        if !self.running {
            return Err(PlaylistError::NotRunning);
        }
        self.looping_step = Some(index);
        Ok(())
    }

    pub fn clear_step_looping(&mut self) {
        self.looping_step = None;
    }

    /// Uniform pick over all steps; does not change playback state
    pub fn random_step(&self) -> Option<&PlaylistStep> {
        self.steps.choose(&mut rand::thread_rng())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn reset_runtime(&mut self) {
        self.running = false;
        self.play_looping = false;
        self.looping_step = None;
        self.paused = false;
        self.pending_stop = PendingStop::None;
        self.current = None;
        self.loop_steps_played = 0;
        self.loops_completed = 0;
        for step in &mut self.steps {
            step.restart();
        }
    }

    fn enter_step(&mut self, index: usize) {
        self.current = Some(index);
        self.steps[index].restart();
    }

    /// Steps repeated on each loop: `start..end`, possibly empty
    fn loop_body(&self) -> (usize, usize) {
        let len = self.steps.len();
        let start = usize::from(self.first_once && len > 0);
        let end = if self.last_once { len.saturating_sub(1) } else { len };
        (start, end.max(start))
    }

    fn random_in_body(&self) -> Option<usize> {
        let (start, end) = self.loop_body();
        (start < end).then(|| rand::thread_rng().gen_range(start..end))
    }

    fn start_index(&self) -> usize {
        if self.random && !self.first_once {
            self.random_in_body().unwrap_or(0)
        } else {
            0
        }
    }

    /// Decide where playback goes when step `index` reaches its end.
    /// `None` means the playlist is finished.
    fn next_after_step_end(&mut self, index: usize) -> Option<usize> {
        let last = self.steps.len() - 1;

        match self.pending_stop {
            PendingStop::AtEndOfStep => return None,
            PendingStop::AfterEndSteps => {
                if self.last_once && index != last {
                    self.pending_stop = PendingStop::AtEndOfStep;
                    return Some(last);
                }
                return None;
            }
            PendingStop::AtEndOfLoop | PendingStop::None => {}
        }

        // A stop at end of loop releases a looping step
        if self.looping_step == Some(index) && self.pending_stop != PendingStop::AtEndOfLoop {
            return Some(index);
        }

        if self.last_once && index == last {
            return None;
        }

        let (body_start, body_end) = self.loop_body();
        if self.random {
            if (body_start..body_end).contains(&index) {
                self.loop_steps_played += 1;
            }
            if self.loop_steps_played < body_end - body_start {
                return self.random_in_body();
            }
        } else if index + 1 < body_end {
            return Some(index + 1);
        }

        self.end_of_loop(index)
    }

    fn end_of_loop(&mut self, index: usize) -> Option<usize> {
        self.loop_steps_played = 0;
        let (body_start, body_end) = self.loop_body();
        let last = self.steps.len() - 1;

        if self.play_looping && self.pending_stop != PendingStop::AtEndOfLoop && body_start < body_end {
            self.loops_completed += 1;
            return if self.random {
                self.random_in_body()
            } else {
                Some(body_start)
            };
        }

        if self.last_once && index != last {
            return Some(last);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holiday() -> Playlist {
        Playlist::new("Holiday")
            .with_step(PlaylistStep::new("Intro", 1000))
            .with_step(PlaylistStep::new("Main", 2000))
            .with_step(PlaylistStep::new("Outro", 1500))
    }

    #[test]
    fn test_start_empty_playlist_fails() {
        let mut playlist = Playlist::new("Empty");
        assert_eq!(playlist.start(false), Err(PlaylistError::NoSteps));
        assert!(!playlist.is_running());
        assert_eq!(playlist.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_holiday_scenario() {
        let mut playlist = holiday();
        playlist.start(false).unwrap();
        assert_eq!(playlist.current_index(), Some(0));

        let outcome = playlist.advance(1000);
        assert!(!outcome.completed);
        assert!(outcome.step_changed);
        assert_eq!(playlist.current_index(), Some(1));
        assert_eq!(playlist.current_step().unwrap().position_ms(), 0);

        let outcome = playlist.advance(3500);
        assert!(outcome.completed);
        assert!(!playlist.is_running());
        assert_eq!(playlist.current_index(), None);
    }

    #[test]
    fn test_advance_zero_is_noop() {
        let mut playlist = holiday();
        playlist.start(false).unwrap();
        playlist.advance(400);

        let outcome = playlist.advance(0);
        assert_eq!(outcome, AdvanceOutcome::default());
        assert_eq!(playlist.current_index(), Some(0));
        assert_eq!(playlist.current_step().unwrap().position_ms(), 400);
    }

    #[test]
    fn test_zero_elapsed_on_zero_length_step_is_noop() {
        let mut playlist = Playlist::new("Blink")
            .with_step(PlaylistStep::new("Flash", 0))
            .with_step(PlaylistStep::new("Hold", 100));
        playlist.start(false).unwrap();
        playlist.advance(0);
        assert_eq!(playlist.current_index(), Some(0));
    }

    #[test]
    fn test_paused_playlist_does_not_advance() {
        let mut playlist = holiday();
        playlist.start(false).unwrap();
        playlist.pause();
        assert_eq!(playlist.phase(), PlaybackPhase::Paused);

        playlist.advance(5000);
        assert_eq!(playlist.current_index(), Some(0));
        assert_eq!(playlist.current_step().unwrap().position_ms(), 0);

        assert!(!playlist.toggle_pause());
        playlist.advance(500);
        assert_eq!(playlist.current_step().unwrap().position_ms(), 500);
    }

    #[test]
    fn test_looping_wraps_to_first_step() {
        let mut playlist = holiday();
        playlist.start(true).unwrap();
        playlist.advance(4500);
        assert!(playlist.is_running());
        assert_eq!(playlist.current_index(), Some(0));
        assert_eq!(playlist.loops_completed(), 1);
    }

    #[test]
    fn test_stop_at_end_of_step_waits_for_boundary() {
        let mut playlist = holiday();
        playlist.start(true).unwrap();
        playlist.advance(300);
        playlist.stop_at_end_of_current_step();
        assert_eq!(playlist.phase(), PlaybackPhase::StoppingAtStepEnd);

        let outcome = playlist.advance(699);
        assert!(!outcome.completed);
        assert_eq!(playlist.current_index(), Some(0));
        assert_eq!(playlist.current_step().unwrap().position_ms(), 999);

        let outcome = playlist.advance(1);
        assert!(outcome.completed);
        assert!(!playlist.is_running());
    }

    #[test]
    fn test_stop_at_end_of_loop() {
        let mut playlist = holiday();
        playlist.start(true).unwrap();
        playlist.advance(1500);
        playlist.stop_at_end_of_this_loop();
        assert_eq!(playlist.phase(), PlaybackPhase::StoppingAtLoopEnd);

        let outcome = playlist.advance(1500);
        assert!(!outcome.completed);
        assert_eq!(playlist.current_index(), Some(2));

        let outcome = playlist.advance(1500);
        assert!(outcome.completed);
    }

    #[test]
    fn test_step_looping_repeats_step() {
        let mut playlist = holiday();
        playlist.start(false).unwrap();
        playlist.loop_step("Intro").unwrap();
        assert!(playlist.is_step_looping());

        playlist.advance(2500);
        assert_eq!(playlist.current_index(), Some(0));
        assert_eq!(playlist.current_step().unwrap().position_ms(), 500);

        playlist.clear_step_looping();
        playlist.advance(500);
        assert_eq!(playlist.current_index(), Some(1));
    }

    #[test]
    fn test_stop_at_end_of_loop_releases_looping_step() {
        let mut playlist = holiday();
        playlist.start(true).unwrap();
        playlist.loop_step("Intro").unwrap();
        playlist.stop_at_end_of_this_loop();

        playlist.advance(1000);
        assert_eq!(playlist.current_step().unwrap().name(), "Main");
        assert!(!playlist.advance(2000).completed);
        assert!(playlist.advance(1500).completed);
        assert!(!playlist.is_running());
    }

    #[test]
    fn test_saved_step_loop_seeds_run() {
        let mut intro = PlaylistStep::new("Intro", 1000);
        intro.set_looping(true);
        let mut playlist = Playlist::new("Attract")
            .with_step(intro)
            .with_step(PlaylistStep::new("Next", 100));

        playlist.start(false).unwrap();
        assert!(playlist.is_step_looping());
        playlist.clear_step_looping();
        assert!(playlist.steps()[0].is_looping());

        playlist.advance(1000);
        assert_eq!(playlist.current_index(), Some(1));
    }

    #[test]
    fn test_run_loop_mode_is_not_saved_setting() {
        let mut playlist = holiday().with_looping(false);
        playlist.start(true).unwrap();
        assert!(playlist.is_looping());
        assert!(!playlist.default_looping());

        playlist.set_loop_playback(false);
        assert!(!playlist.is_looping());
        assert!(!playlist.is_dirty());

        playlist.stop();
        assert!(!playlist.is_looping());
        playlist.set_loop_playback(true);
        assert!(!playlist.is_looping());
    }

    #[test]
    fn test_loop_step_unknown_name() {
        let mut playlist = holiday();
        assert_eq!(
            playlist.loop_step("Nope"),
            Err(PlaylistError::StepNotFound("Nope".into()))
        );
        assert_eq!(playlist.loop_step("Intro"), Err(PlaylistError::NotRunning));
    }

    #[test]
    fn test_jump_to_step() {
        let mut playlist = holiday();
        assert_eq!(playlist.jump_to_step("Main"), Err(PlaylistError::NotRunning));

        playlist.start(false).unwrap();
        playlist.advance(200);
        assert_eq!(playlist.jump_to_step("Outro"), Ok(DEFAULT_FRAME_MS));
        assert_eq!(playlist.current_index(), Some(2));
        assert_eq!(playlist.current_step().unwrap().position_ms(), 0);

        assert_eq!(
            playlist.jump_to_step("Missing"),
            Err(PlaylistError::StepNotFound("Missing".into()))
        );
        assert_eq!(playlist.current_index(), Some(2));
    }

    #[test]
    fn test_next_and_prior_navigation() {
        let mut playlist = Playlist::new("Nav")
            .with_step(PlaylistStep::new("A", 1000).with_frame_ms(25))
            .with_step(PlaylistStep::new("B", 1000).with_frame_ms(40));

        playlist.start(false).unwrap();
        assert_eq!(playlist.jump_to_prior_step(), Ok(25));
        assert_eq!(playlist.current_index(), Some(0));

        assert_eq!(playlist.jump_to_next_step(), Ok(40));
        assert_eq!(playlist.current_index(), Some(1));

        // No wrap without looping: next at the end stops
        playlist.jump_to_next_step().unwrap();
        assert!(!playlist.is_running());

        playlist.start(true).unwrap();
        assert_eq!(playlist.jump_to_prior_step(), Ok(40));
        assert_eq!(playlist.current_index(), Some(1));
        assert_eq!(playlist.jump_to_next_step(), Ok(25));
        assert_eq!(playlist.current_index(), Some(0));
    }

    #[test]
    fn test_first_and_last_once() {
        let mut playlist = Playlist::new("Show")
            .with_step(PlaylistStep::new("Welcome", 100))
            .with_step(PlaylistStep::new("Song1", 100))
            .with_step(PlaylistStep::new("Song2", 100))
            .with_step(PlaylistStep::new("Goodnight", 100))
            .with_play_once(true, true);

        playlist.start(true).unwrap();
        playlist.advance(100);
        assert_eq!(playlist.current_step().unwrap().name(), "Song1");
        playlist.advance(200);
        // Loop body is Song1..Song2; Welcome is not replayed
        assert_eq!(playlist.current_step().unwrap().name(), "Song1");

        playlist.stop_at_end_of_this_loop();
        playlist.advance(200);
        assert_eq!(playlist.current_step().unwrap().name(), "Goodnight");
        let outcome = playlist.advance(100);
        assert!(outcome.completed);
    }

    #[test]
    fn test_jump_to_end_steps() {
        let mut playlist = holiday().with_play_once(false, true);
        playlist.start(true).unwrap();
        playlist.jump_to_end_steps_at_end_of_current_step();

        playlist.advance(1000);
        assert_eq!(playlist.current_step().unwrap().name(), "Outro");
        let outcome = playlist.advance(1500);
        assert!(outcome.completed);
    }

    #[test]
    fn test_random_mode_stays_in_range() {
        let mut playlist = holiday().with_random(true);
        playlist.start(true).unwrap();
        for _ in 0..50 {
            playlist.advance(700);
            assert!(playlist.is_running());
            assert!(playlist.current_index().unwrap() < 3);
        }
        assert!(playlist.random_step().is_some());
    }

    #[test]
    fn test_random_non_looping_plays_body_length_then_completes() {
        let mut playlist = Playlist::new("Shuffle")
            .with_step(PlaylistStep::new("A", 100))
            .with_step(PlaylistStep::new("B", 100))
            .with_random(true);
        playlist.start(false).unwrap();
        assert!(!playlist.advance(100).completed);
        assert!(playlist.advance(100).completed);
    }

    #[test]
    fn test_instantiate_is_independent_copy() {
        let mut original = holiday().with_priority(5);
        original.set_random(true);
        let mut copy = original.instantiate();

        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.name(), "Holiday");
        assert_eq!(copy.priority(), 5);
        assert!(!copy.is_dirty());

        copy.start(false).unwrap();
        copy.advance(1500);
        assert!(!original.is_running());
        assert_eq!(original.steps()[0].position_ms(), 0);
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut playlist = holiday();
        assert!(!playlist.is_dirty());
        playlist.set_looping(false);
        assert!(!playlist.is_dirty());
        playlist.set_looping(true);
        assert!(playlist.is_dirty());
        playlist.clear_dirty();
        playlist.add_step(PlaylistStep::new("Encore", 100));
        assert!(playlist.is_dirty());
        assert_eq!(playlist.length_ms(), 4600);
    }
}
