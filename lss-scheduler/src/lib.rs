//! # Light Show Scheduler (lss-scheduler)
//!
//! Plays prioritized playlists of timed steps and emits one frame of channel
//! data per tick to networked lighting controllers.
//!
//! - [`playlist`]: step sequencing state machine
//! - [`schedule`]: arbitration, frame tick, time windows, persistence
//! - [`command`] / [`query`]: remote control protocol
//! - [`output`]: channel sinks; [`render`]: step renderers
//! - [`pump`]: fixed-cadence driver; [`api`]: HTTP/SSE surface

pub mod api;
pub mod command;
pub mod config;
pub mod error;
pub mod output;
pub mod playlist;
pub mod pump;
pub mod query;
pub mod render;
pub mod schedule;
pub mod stash;

pub use command::{CommandInterpreter, CommandOutcome};
pub use error::{Error, Result};
pub use query::{QueryInterface, QueryOutcome};
pub use schedule::{PlayRequest, Scheduler, TickOutcome};
