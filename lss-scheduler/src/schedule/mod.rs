//! Scheduler: playlist arbitration and the per-frame tick
//!
//! The scheduler owns every playlist, the single immediate-override slot and
//! the frame buffer. Two locks are involved:
//!
//! - `state` guards playlists, the override slot and options. Commands hold it
//!   for one mutation; `tick` holds it only to resolve, advance and snapshot.
//! - `buffer` is only ever taken by `tick` (with `try_lock`, so overlapping
//!   ticks are skipped rather than queued). Rendering and the sink hand-off
//!   happen with `state` released.
//!
//! Arbitration: a running override always wins; otherwise the running
//! scheduled playlist with the highest priority wins, earliest inserted on
//! ties.

pub mod options;
pub mod persist;
pub mod window;

use crate::error::{Error, Result};
use crate::output::{ChannelBuffer, OutputSink};
use crate::playlist::{Playlist, DEFAULT_FRAME_MS};
use crate::render::{RendererRegistry, StepFrame};
use chrono::{NaiveDateTime, Utc};
use lss_common::events::{EventBus, SchedulerEvent, StartTrigger, StopReason};
use lss_common::human_time::format_show_time_coarse;
use options::{ButtonDef, ScheduleOptions};
use persist::{PlaylistRecord, ScheduleFile, SCHEDULE_FILE};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Rate hint returned by every "play" command: start fast
pub const PLAY_RATE_MS: u32 = 25;

/// Default master volume
pub const DEFAULT_VOLUME: u8 = 100;

/// What one tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous tick still holds the frame buffer
    Skipped,
    /// Nothing active; `blanked` when an all-off frame was pushed
    Idle { blanked: bool },
    /// Active entity rendered and the frame was handed to the sink
    Rendered { playlist: String, step: String },
    /// Active entity finished or faulted this tick and was retired
    Retired { playlist: String, reason: StopReason },
}

/// Identity of the authoritative playlist at the moment of the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSummary {
    pub id: Uuid,
    pub name: String,
    pub is_override: bool,
}

/// Live projection of the authoritative playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStatus {
    pub playlist: String,
    pub paused: bool,
    pub looping: bool,
    pub random: bool,
    pub step: String,
    pub step_looping: bool,
    pub length_ms: u64,
    pub position_ms: u64,
}

/// How an immediate override should start
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayRequest<'a> {
    pub looping: bool,
    /// Begin at this step instead of the first
    pub start_step: Option<&'a str>,
    /// Begin at a uniformly chosen step
    pub random_step: bool,
    /// Make the start step the looping step
    pub loop_start_step: bool,
    /// Stop once the start step ends
    pub stop_after_step: bool,
}

/// Scheduled playlist plus its schedule bookkeeping
struct Entry {
    playlist: Playlist,
    /// Started by `check_schedule` rather than an operator
    started_by_schedule: bool,
    /// Not restarted until its window closes (operator stop, completion)
    suppressed: bool,
    /// Extension of the current window occurrence
    extra_minutes: u32,
}

impl Entry {
    fn new(playlist: Playlist) -> Self {
        Self {
            playlist,
            started_by_schedule: false,
            suppressed: false,
            extra_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    Override,
    Scheduled(usize),
}

struct ScheduleState {
    entries: Vec<Entry>,
    override_slot: Option<Playlist>,
    options: ScheduleOptions,
    volume: u8,
    /// Collection-level edits (add/remove/load)
    dirty: bool,
    last_tick_ms: Option<u64>,
    /// Last step announced via `StepChanged`
    last_step: Option<(Uuid, usize)>,
}

impl ScheduleState {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            override_slot: None,
            options: ScheduleOptions::default(),
            volume: DEFAULT_VOLUME,
            dirty: false,
            last_tick_ms: None,
            last_step: None,
        }
    }

    fn resolve(&mut self) -> Option<Active> {
        match &self.override_slot {
            Some(session) if session.is_running() => return Some(Active::Override),
            Some(_) => self.override_slot = None,
            None => {}
        }

        let mut best: Option<(usize, i32)> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.playlist.is_running() {
                continue;
            }
            let priority = entry.playlist.priority();
            if best.map_or(true, |(_, p)| priority > p) {
                best = Some((index, priority));
            }
        }
        best.map(|(index, _)| Active::Scheduled(index))
    }

    fn get(&self, active: Active) -> Option<&Playlist> {
        match active {
            Active::Override => self.override_slot.as_ref(),
            Active::Scheduled(index) => self.entries.get(index).map(|e| &e.playlist),
        }
    }

    fn get_mut(&mut self, active: Active) -> Option<&mut Playlist> {
        match active {
            Active::Override => self.override_slot.as_mut(),
            Active::Scheduled(index) => self.entries.get_mut(index).map(|e| &mut e.playlist),
        }
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.playlist.name() == name)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.playlist.name() == name)
    }

    /// Stop and release whatever `active` refers to
    fn retire(&mut self, active: Active, reason: StopReason) -> Option<SchedulerEvent> {
        let playlist = match active {
            Active::Override => {
                let mut session = self.override_slot.take()?;
                session.stop();
                session
            }
            Active::Scheduled(index) => {
                let entry = self.entries.get_mut(index)?;
                entry.playlist.stop();
                entry.suppressed = true;
                entry.started_by_schedule = false;
                entry.playlist.clone()
            }
        };
        Some(stopped_event(&playlist, reason))
    }

    /// Retire the entity with this instance id, if it still exists
    fn retire_by_id(&mut self, id: Uuid, reason: StopReason) -> Option<SchedulerEvent> {
        if self.override_slot.as_ref().is_some_and(|p| p.id() == id) {
            return self.retire(Active::Override, reason);
        }
        let index = self.entries.iter().position(|e| e.playlist.id() == id)?;
        self.retire(Active::Scheduled(index), reason)
    }

    /// Running entities with the given name: the override and/or the scheduled one
    fn running_named(&self, name: &str) -> Vec<Active> {
        let mut found = Vec::new();
        if self
            .override_slot
            .as_ref()
            .is_some_and(|p| p.is_running() && p.name() == name)
        {
            found.push(Active::Override);
        }
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.playlist.is_running() && e.playlist.name() == name)
        {
            found.push(Active::Scheduled(index));
        }
        found
    }

    fn is_dirty(&self) -> bool {
        self.dirty || self.options.is_dirty() || self.entries.iter().any(|e| e.playlist.is_dirty())
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
        self.options.clear_dirty();
        for entry in &mut self.entries {
            entry.playlist.clear_dirty();
        }
    }

    fn to_file(&self) -> ScheduleFile {
        ScheduleFile {
            options: self.options.clone(),
            playlists: self
                .entries
                .iter()
                .map(|e| PlaylistRecord::from(&e.playlist))
                .collect(),
        }
    }

    /// Shortest preferred frame interval among running entities
    fn desired_frame_ms(&self) -> u32 {
        self.override_slot
            .iter()
            .chain(self.entries.iter().map(|e| &e.playlist))
            .filter(|p| p.is_running())
            .filter_map(|p| p.current_step().map(|s| s.frame_ms()))
            .min()
            .unwrap_or(DEFAULT_FRAME_MS)
    }
}

fn started_event(playlist: &Playlist, trigger: StartTrigger) -> SchedulerEvent {
    SchedulerEvent::PlaylistStarted {
        playlist: playlist.name().to_string(),
        session_id: playlist.id(),
        trigger,
        timestamp: Utc::now(),
    }
}

fn stopped_event(playlist: &Playlist, reason: StopReason) -> SchedulerEvent {
    SchedulerEvent::PlaylistStopped {
        playlist: playlist.name().to_string(),
        session_id: playlist.id(),
        reason,
        timestamp: Utc::now(),
    }
}

/// Playlist arbitration, command target resolution and frame production
pub struct Scheduler {
    state: Mutex<ScheduleState>,
    buffer: Mutex<ChannelBuffer>,
    sink: Arc<dyn OutputSink>,
    renderers: RendererRegistry,
    events: Arc<EventBus>,
    epoch: Instant,
    show_dir: PathBuf,
    save_on_exit: bool,
}

impl Scheduler {
    /// The frame buffer is sized from `sink.total_channels()` and never resized.
    pub fn new(
        sink: Arc<dyn OutputSink>,
        renderers: RendererRegistry,
        events: Arc<EventBus>,
        show_dir: impl Into<PathBuf>,
    ) -> Self {
        let channels = sink.total_channels();
        Self {
            state: Mutex::new(ScheduleState::new()),
            buffer: Mutex::new(ChannelBuffer::new(channels)),
            sink,
            renderers,
            events,
            epoch: Instant::now(),
            show_dir: show_dir.into(),
            save_on_exit: true,
        }
    }

    pub fn with_save_on_exit(mut self, save_on_exit: bool) -> Self {
        self.save_on_exit = save_on_exit;
        self
    }

    pub fn show_dir(&self) -> &Path {
        &self.show_dir
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.show_dir.join(SCHEDULE_FILE)
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn total_channels(&self) -> usize {
        self.sink.total_channels()
    }

    /// Milliseconds since the scheduler was created; the tick clock
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn lock_state(&self) -> MutexGuard<'_, ScheduleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_all(&self, events: impl IntoIterator<Item = SchedulerEvent>) {
        for event in events {
            self.events.emit_lossy(event);
        }
    }

    // ------------------------------------------------------------------
    // Frame production
    // ------------------------------------------------------------------

    /// Authoritative playlist right now, if any
    pub fn resolve_active(&self) -> Option<ActiveSummary> {
        let mut state = self.lock_state();
        let active = state.resolve()?;
        state.get(active).map(|p| ActiveSummary {
            id: p.id(),
            name: p.name().to_string(),
            is_override: active == Active::Override,
        })
    }

    /// Produce one frame at `now_ms` (milliseconds on the `elapsed_ms` clock).
    ///
    /// Never blocks: an overlapping tick is skipped, and the sink is expected
    /// to accept or drop the frame immediately.
    pub fn tick(&self, now_ms: u64) -> TickOutcome {
        let mut buffer = match self.buffer.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                trace!("Tick at {}ms skipped: previous tick in progress", now_ms);
                return TickOutcome::Skipped;
            }
        };

        let mut events = Vec::new();
        let (snapshot, send_off_when_idle) = {
            let mut state = self.lock_state();
            let elapsed = state
                .last_tick_ms
                .map_or(0, |last| now_ms.saturating_sub(last));
            state.last_tick_ms = Some(now_ms);
            let send_off_when_idle = state.options.send_off_when_idle();

            let snapshot = match state.resolve() {
                None => {
                    state.last_step = None;
                    None
                }
                Some(active) => self.advance_active(&mut state, active, elapsed, &mut events),
            };
            (snapshot, send_off_when_idle)
        };

        let outcome = match snapshot {
            Some(Ok((id, frame))) => {
                match self.renderers.render(&frame, buffer.as_mut_slice()) {
                    Ok(()) => {
                        self.push(buffer.as_slice(), now_ms);
                        TickOutcome::Rendered {
                            playlist: frame.playlist,
                            step: frame.step,
                        }
                    }
                    Err(e) => {
                        error!(
                            "Render fault in '{}' step '{}': {}; retiring",
                            frame.playlist, frame.step, e
                        );
                        if let Some(event) = self.lock_state().retire_by_id(id, StopReason::Fault)
                        {
                            events.push(event);
                        }
                        self.idle_output(&mut buffer, send_off_when_idle, now_ms);
                        TickOutcome::Retired {
                            playlist: frame.playlist,
                            reason: StopReason::Fault,
                        }
                    }
                }
            }
            Some(Err((playlist, reason))) => {
                self.idle_output(&mut buffer, send_off_when_idle, now_ms);
                TickOutcome::Retired { playlist, reason }
            }
            None => TickOutcome::Idle {
                blanked: self.idle_output(&mut buffer, send_off_when_idle, now_ms),
            },
        };

        drop(buffer);
        self.emit_all(events);
        outcome
    }

    /// Advance the active entity under the state lock and snapshot its frame.
    ///
    /// `Err` carries the name and reason of an entity retired this tick.
    #[allow(clippy::type_complexity)]
    fn advance_active(
        &self,
        state: &mut ScheduleState,
        active: Active,
        elapsed: u64,
        events: &mut Vec<SchedulerEvent>,
    ) -> Option<std::result::Result<(Uuid, StepFrame), (String, StopReason)>> {
        let playlist = state.get_mut(active)?;
        let outcome = playlist.advance(elapsed);
        let name = playlist.name().to_string();

        if outcome.completed {
            info!("Playlist '{}' completed", name);
            events.extend(state.retire(active, StopReason::Completed));
            state.last_step = None;
            return Some(Err((name, StopReason::Completed)));
        }

        let id = playlist.id();
        let Some(frame) = playlist.current_frame() else {
            warn!("Playlist '{}' running without a current step; retiring", name);
            events.extend(state.retire(active, StopReason::Fault));
            return Some(Err((name, StopReason::Fault)));
        };

        let marker = playlist.current_index().map(|index| (id, index));
        if marker != state.last_step {
            debug!(
                "'{}' now on step '{}' ({})",
                name,
                frame.step,
                format_show_time_coarse(frame.length_ms)
            );
            events.push(SchedulerEvent::StepChanged {
                playlist: name,
                step: frame.step.clone(),
                timestamp: Utc::now(),
            });
            state.last_step = marker;
        }

        Some(Ok((id, frame)))
    }

    fn push(&self, channels: &[u8], now_ms: u64) {
        if let Err(e) = self.sink.send_frame(channels, now_ms) {
            debug!("Frame at {}ms not sent: {}", now_ms, e);
        }
    }

    /// Blank and push when configured; returns whether a frame was pushed
    fn idle_output(&self, buffer: &mut ChannelBuffer, send_off_when_idle: bool, now_ms: u64) -> bool {
        if !send_off_when_idle {
            return false;
        }
        buffer.zero();
        self.push(buffer.as_slice(), now_ms);
        true
    }

    /// Start and stop scheduled playlists according to their windows.
    ///
    /// Returns the desired frame interval: the shortest `frame_ms` among
    /// running entities.
    pub fn check_schedule(&self, now: NaiveDateTime) -> u32 {
        let mut events = Vec::new();
        let frame_ms = {
            let mut state = self.lock_state();
            for entry in &mut state.entries {
                let Some(window) = entry.playlist.schedule() else {
                    continue;
                };
                let looping = window.looping;

                if window.is_active(now, entry.extra_minutes) {
                    if entry.playlist.is_running() || entry.suppressed {
                        continue;
                    }
                    match entry.playlist.start(looping) {
                        Ok(()) => {
                            info!("Schedule started '{}'", entry.playlist.name());
                            entry.started_by_schedule = true;
                            events.push(started_event(&entry.playlist, StartTrigger::Schedule));
                        }
                        Err(e) => {
                            warn!("Schedule could not start '{}': {}", entry.playlist.name(), e);
                            entry.suppressed = true;
                        }
                    }
                } else {
                    entry.suppressed = false;
                    entry.extra_minutes = 0;
                    if std::mem::take(&mut entry.started_by_schedule) && entry.playlist.is_running()
                    {
                        info!(
                            "Schedule window closed for '{}'; stopping at end of step",
                            entry.playlist.name()
                        );
                        entry.playlist.stop_at_end_of_current_step();
                    }
                }
            }
            state.desired_frame_ms()
        };

        self.emit_all(events);
        frame_ms
    }

    // ------------------------------------------------------------------
    // Immediate override
    // ------------------------------------------------------------------

    /// Start an immediate override copy of `name`.
    ///
    /// The new session is fully constructed and positioned before it replaces
    /// the slot, so a failed request leaves the current override running.
    /// Returns the start rate hint.
    pub fn play_playlist(&self, name: &str, request: PlayRequest<'_>) -> Result<u32> {
        let (started, replaced) = {
            let mut state = self.lock_state();
            let source = state
                .entry(name)
                .ok_or_else(|| Error::PlaylistNotFound(name.to_string()))?;
            let mut session = source.playlist.instantiate();

            let random_pick = if request.random_step {
                session.random_step().map(|s| s.name().to_string())
            } else {
                None
            };
            let start_step = request.start_step.or(random_pick.as_deref());

            session.start(request.looping)?;
            if let Some(step) = start_step {
                session.jump_to_step(step)?;
                if request.loop_start_step {
                    session.loop_step(step)?;
                }
            }
            if request.stop_after_step {
                session.stop_at_end_of_current_step();
            }

            let started = started_event(&session, StartTrigger::Immediate);
            let replaced = state.override_slot.replace(session).and_then(|mut old| {
                let was_running = old.is_running();
                old.stop();
                was_running.then(|| stopped_event(&old, StopReason::Replaced))
            });
            (started, replaced)
        };

        if replaced.is_some() {
            info!("Immediate override replaced by '{}'", name);
        } else {
            info!("Immediate override '{}' started", name);
        }
        self.emit_all(replaced.into_iter().chain(std::iter::once(started)));
        Ok(PLAY_RATE_MS)
    }

    // ------------------------------------------------------------------
    // Stopping
    // ------------------------------------------------------------------

    /// Hard stop of the override and/or scheduled playlist named `name`
    pub fn stop_playlist(&self, name: &str) -> Result<()> {
        let events = {
            let mut state = self.lock_state();
            let known = state.entry(name).is_some()
                || state.override_slot.as_ref().is_some_and(|p| p.name() == name);
            if !known {
                return Err(Error::PlaylistNotFound(name.to_string()));
            }
            let targets = state.running_named(name);
            targets
                .into_iter()
                .filter_map(|active| state.retire(active, StopReason::Stopped))
                .collect::<Vec<_>>()
        };

        if !events.is_empty() {
            info!("Stopped '{}'", name);
        }
        self.emit_all(events);
        Ok(())
    }

    /// Deferred stop of every running instance named `name`
    pub fn stop_playlist_deferred(&self, name: &str, at_end_of_loop: bool) -> Result<()> {
        let mut state = self.lock_state();
        if state.entry(name).is_none() {
            return Err(Error::PlaylistNotFound(name.to_string()));
        }
        for active in state.running_named(name) {
            if let Some(playlist) = state.get_mut(active) {
                if at_end_of_loop {
                    playlist.stop_at_end_of_this_loop();
                } else {
                    playlist.stop_at_end_of_current_step();
                }
            }
        }
        Ok(())
    }

    /// Hard stop of everything
    pub fn stop_all(&self) {
        let events = {
            let mut state = self.lock_state();
            let mut events = Vec::new();
            events.extend(state.retire(Active::Override, StopReason::Stopped));
            for index in 0..state.entries.len() {
                if state.entries[index].playlist.is_running() {
                    events.extend(state.retire(Active::Scheduled(index), StopReason::Stopped));
                }
            }
            state.last_step = None;
            events
        };

        info!("Stopped all playlists ({} running)", events.len());
        self.emit_all(events);
    }

    // ------------------------------------------------------------------
    // Command targets
    // ------------------------------------------------------------------

    /// Run `f` against the authoritative playlist.
    ///
    /// An entity that is no longer running afterwards (e.g. "next step" past
    /// the end) is retired immediately.
    pub fn with_active<R>(&self, f: impl FnOnce(&mut Playlist) -> R) -> Result<R> {
        let (result, event) = {
            let mut state = self.lock_state();
            let active = state.resolve().ok_or(Error::NoActivePlaylist)?;
            let playlist = state.get_mut(active).ok_or(Error::NoActivePlaylist)?;
            let result = f(playlist);
            let event = if playlist.is_running() {
                None
            } else {
                state.retire(active, StopReason::Stopped)
            };
            (result, event)
        };

        self.emit_all(event);
        Ok(result)
    }

    /// Run `f` against the scheduled playlist named `name`
    pub fn with_playlist<R>(&self, name: &str, f: impl FnOnce(&mut Playlist) -> R) -> Result<R> {
        let mut state = self.lock_state();
        let entry = state
            .entry_mut(name)
            .ok_or_else(|| Error::PlaylistNotFound(name.to_string()))?;
        Ok(f(&mut entry.playlist))
    }

    /// Extend the current window occurrence of a scheduled playlist
    pub fn extend_schedule(&self, name: &str, minutes: u32) -> Result<()> {
        let mut state = self.lock_state();
        let entry = state
            .entry_mut(name)
            .ok_or_else(|| Error::PlaylistNotFound(name.to_string()))?;
        if entry.playlist.schedule().is_none() {
            return Err(Error::NotScheduled(name.to_string()));
        }
        entry.extra_minutes = entry.extra_minutes.saturating_add(minutes);
        info!(
            "Schedule for '{}' extended by {} minute(s) ({} total)",
            name, minutes, entry.extra_minutes
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Collection management
    // ------------------------------------------------------------------

    pub fn add_playlist(&self, playlist: Playlist) -> Result<()> {
        let mut state = self.lock_state();
        if state.entry(playlist.name()).is_some() {
            return Err(Error::DuplicatePlaylist(playlist.name().to_string()));
        }
        if let Some(step) = playlist
            .steps()
            .iter()
            .find(|s| !self.renderers.contains(s.renderer()))
        {
            warn!(
                "Playlist '{}' step '{}' uses unknown renderer '{}'",
                playlist.name(),
                step.name(),
                step.renderer()
            );
        }
        debug!("Added playlist '{}'", playlist.name());
        state.entries.push(Entry::new(playlist));
        state.dirty = true;
        Ok(())
    }

    /// Stop (if running) and remove a scheduled playlist
    pub fn remove_playlist(&self, name: &str) -> Result<()> {
        let event = {
            let mut state = self.lock_state();
            let index = state
                .entries
                .iter()
                .position(|e| e.playlist.name() == name)
                .ok_or_else(|| Error::PlaylistNotFound(name.to_string()))?;
            let event = if state.entries[index].playlist.is_running() {
                state.retire(Active::Scheduled(index), StopReason::Removed)
            } else {
                None
            };
            state.entries.remove(index);
            state.dirty = true;
            event
        };

        info!("Removed playlist '{}'", name);
        self.emit_all(event);
        Ok(())
    }

    pub fn playlist_names(&self) -> Vec<String> {
        self.lock_state()
            .entries
            .iter()
            .map(|e| e.playlist.name().to_string())
            .collect()
    }

    /// Name and total length of every scheduled playlist, in order
    pub fn playlist_lengths(&self) -> Vec<(String, u64)> {
        self.lock_state()
            .entries
            .iter()
            .map(|e| (e.playlist.name().to_string(), e.playlist.length_ms()))
            .collect()
    }

    /// Name and length of each step of `name`
    pub fn playlist_steps(&self, name: &str) -> Result<Vec<(String, u64)>> {
        let state = self.lock_state();
        let entry = state
            .entry(name)
            .ok_or_else(|| Error::PlaylistNotFound(name.to_string()))?;
        Ok(entry
            .playlist
            .steps()
            .iter()
            .map(|s| (s.name().to_string(), s.length_ms()))
            .collect())
    }

    /// Copy of a scheduled playlist, including its runtime state
    pub fn playlist(&self, name: &str) -> Option<Playlist> {
        self.lock_state().entry(name).map(|e| e.playlist.clone())
    }

    /// Live status of the authoritative playlist
    pub fn active_status(&self) -> Option<ActiveStatus> {
        let mut state = self.lock_state();
        let active = state.resolve()?;
        let playlist = state.get(active)?;
        let step = playlist.current_step()?;
        Some(ActiveStatus {
            playlist: playlist.name().to_string(),
            paused: playlist.is_paused(),
            looping: playlist.is_looping(),
            random: playlist.is_random(),
            step: step.name().to_string(),
            step_looping: playlist.is_step_looping(),
            length_ms: step.length_ms(),
            position_ms: step.position_ms(),
        })
    }

    /// `Idle` or `Playing <step> <position>/<length>`
    pub fn get_status(&self) -> String {
        let mut state = self.lock_state();
        let step = state
            .resolve()
            .and_then(|active| state.get(active))
            .and_then(|p| p.current_step());
        match step {
            Some(step) => format!("Playing {} {}", step.name(), step.status()),
            None => "Idle".to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Options, volume, output
    // ------------------------------------------------------------------

    pub fn button(&self, label: &str) -> Option<ButtonDef> {
        self.lock_state().options.button(label).cloned()
    }

    pub fn add_button(&self, button: ButtonDef) {
        self.lock_state().options.add_button(button);
    }

    pub fn buttons_json(&self) -> Value {
        self.lock_state().options.buttons_json()
    }

    pub fn set_send_off_when_idle(&self, enabled: bool) {
        self.lock_state().options.set_send_off_when_idle(enabled);
    }

    pub fn volume(&self) -> u8 {
        self.lock_state().volume
    }

    /// Set master volume, clamped to 0..=100; returns the stored value
    pub fn set_volume(&self, volume: i64) -> u8 {
        let volume = volume.clamp(0, 100) as u8;
        let changed = {
            let mut state = self.lock_state();
            std::mem::replace(&mut state.volume, volume) != volume
        };
        if changed {
            debug!("Volume set to {}", volume);
            self.events.emit_lossy(SchedulerEvent::VolumeChanged {
                volume,
                timestamp: Utc::now(),
            });
        }
        volume
    }

    pub fn adjust_volume(&self, delta: i64) -> u8 {
        let current = i64::from(self.volume());
        self.set_volume(current.saturating_add(delta))
    }

    pub fn is_outputting(&self) -> bool {
        self.sink.is_outputting()
    }

    pub fn start_output(&self) -> Result<()> {
        self.sink.start_output()?;
        info!("Output to lights started");
        self.events.emit_lossy(SchedulerEvent::OutputToggled {
            enabled: true,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn stop_output(&self) {
        if let Err(e) = self.sink.all_off() {
            debug!("All-off before stopping output failed: {}", e);
        }
        self.sink.stop_output();
        info!("Output to lights stopped");
        self.events.emit_lossy(SchedulerEvent::OutputToggled {
            enabled: false,
            timestamp: Utc::now(),
        });
    }

    /// Flip output on/off; returns whether output is now enabled
    pub fn toggle_output(&self) -> Result<bool> {
        if self.sink.is_outputting() {
            self.stop_output();
            Ok(false)
        } else {
            self.start_output()?;
            Ok(true)
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.lock_state().is_dirty()
    }

    pub fn clear_dirty(&self) {
        self.lock_state().clear_dirty();
    }

    /// Replace all playlists and options from `path`.
    ///
    /// Anything running is stopped first. A missing or malformed file yields
    /// an empty schedule.
    pub fn load_from(&self, path: &Path) {
        let file = persist::load_or_default(path);
        self.stop_all();

        let mut state = self.lock_state();
        state.entries.clear();
        state.options = file.options;
        for record in file.playlists {
            let playlist = Playlist::from(record);
            if state.entry(playlist.name()).is_some() {
                warn!("Duplicate playlist '{}' in schedule ignored", playlist.name());
                continue;
            }
            state.entries.push(Entry::new(playlist));
        }
        state.clear_dirty();
    }

    /// Load `<show_dir>/schedule.toml`
    pub fn load(&self) {
        self.load_from(&self.schedule_path());
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let file = self.lock_state().to_file();
        persist::save(path, &file)?;
        self.clear_dirty();

        info!("Saved schedule to {}", path.display());
        self.events.emit_lossy(SchedulerEvent::ScheduleSaved {
            path: path.display().to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Save to `<show_dir>/schedule.toml`
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.schedule_path())
    }

    /// Stop everything, stop output and save unsaved changes
    pub fn shutdown(&self) {
        self.stop_all();
        if self.sink.is_outputting() {
            self.stop_output();
        }
        if self.save_on_exit && self.is_dirty() {
            if let Err(e) = self.save() {
                error!("Failed to save schedule on shutdown: {}", e);
            }
        }
        info!("Scheduler shut down");
    }
}
