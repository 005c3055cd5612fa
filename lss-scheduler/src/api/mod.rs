//! HTTP control surface
//!
//! - `GET /health`
//! - `GET /xScheduleCommand?Command=..&Parameters=..`
//! - `GET /xScheduleQuery?Query=..&Parameters=..`
//! - `GET|POST /xScheduleStash?Command=Store|Retrieve&Key=..`
//! - `GET /events` (SSE)

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, serve, AppContext};
