//! Router construction and server lifecycle

use crate::command::CommandInterpreter;
use crate::error::{Error, Result};
use crate::query::QueryInterface;
use crate::schedule::Scheduler;
use crate::stash::Stash;
use axum::{routing::get, Router};
use lss_common::EventBus;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub scheduler: Arc<Scheduler>,
    pub commands: Arc<CommandInterpreter>,
    pub queries: Arc<QueryInterface>,
    pub stash: Arc<Stash>,
    pub events: Arc<EventBus>,
}

impl AppContext {
    /// Wire the command, query and stash front-ends to one scheduler
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            commands: Arc::new(CommandInterpreter::new(Arc::clone(&scheduler))),
            queries: Arc::new(QueryInterface::new(Arc::clone(&scheduler))),
            stash: Arc::new(Stash::new(scheduler.show_dir())),
            events: Arc::clone(scheduler.events()),
            scheduler,
        }
    }
}

pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/xScheduleCommand", get(super::handlers::command))
        .route("/xScheduleQuery", get(super::handlers::query))
        .route(
            "/xScheduleStash",
            get(super::handlers::stash).post(super::handlers::stash),
        )
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Control surfaces are served from other origins
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves
pub async fn serve(
    ctx: AppContext,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
