//! Shared fixtures for lss-scheduler integration tests

#![allow(dead_code)]

use lss_common::EventBus;
use lss_scheduler::output::RecordingSink;
use lss_scheduler::playlist::{Playlist, PlaylistStep};
use lss_scheduler::render::RendererRegistry;
use lss_scheduler::Scheduler;
use std::path::Path;
use std::sync::Arc;

pub const CHANNELS: usize = 6;

/// Scheduler over a recording sink, with its show folder at `show_dir`
pub fn scheduler_in(show_dir: &Path) -> (Arc<Scheduler>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new(CHANNELS));
    let scheduler = Arc::new(Scheduler::new(
        sink.clone(),
        RendererRegistry::default(),
        Arc::new(EventBus::default()),
        show_dir,
    ));
    (scheduler, sink)
}

/// Three steps of [1000, 2000, 1500] ms
pub fn holiday() -> Playlist {
    Playlist::new("Holiday")
        .with_step(PlaylistStep::new("Intro", 1000).with_renderer("on"))
        .with_step(PlaylistStep::new("Main", 2000).with_renderer("fade"))
        .with_step(PlaylistStep::new("Outro", 1500))
}

pub fn two_step(name: &str, priority: i32) -> Playlist {
    Playlist::new(name)
        .with_priority(priority)
        .with_step(PlaylistStep::new("One", 500).with_frame_ms(40))
        .with_step(PlaylistStep::new("Two", 500).with_frame_ms(20))
}
