//! # LSS Common Library
//!
//! Shared code for the light show scheduler crates:
//! - Error type shared by configuration helpers
//! - Scheduler event types and the broadcast EventBus
//! - Bootstrap configuration resolution (CLI > environment > TOML > default)
//! - Show time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{EventBus, SchedulerEvent};
