//! Light Show Scheduler - main entry point
//!
//! Loads the show folder's schedule, starts the frame pump and serves the
//! HTTP control surface until Ctrl+C / SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lss_common::EventBus;
use lss_scheduler::api::{self, AppContext};
use lss_scheduler::config::TomlConfig;
use lss_scheduler::output::{NullSink, OutputSink, QueuedSink, UdpSink};
use lss_scheduler::pump::FramePump;
use lss_scheduler::render::RendererRegistry;
use lss_scheduler::Scheduler;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for lss-scheduler
#[derive(Parser, Debug)]
#[command(name = "lss-scheduler")]
#[command(about = "Light show playlist scheduler and frame pump")]
#[command(version)]
struct Args {
    /// Bootstrap config file (falls back to LSS_CONFIG, then the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show folder holding schedule.toml and the data stash
    #[arg(short, long, env = "LSS_SHOW_DIR")]
    show_dir: Option<PathBuf>,

    /// HTTP control port
    #[arg(short, long, env = "LSS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;

    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lss_scheduler={level},lss_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let show_dir = config.resolve_show_dir(args.show_dir);
    let port = config.resolve_port(args.port);
    info!("Starting Light Show Scheduler v{}", env!("CARGO_PKG_VERSION"));
    info!("Show folder: {}", show_dir.display());

    let total_channels = config.output.total_channels;
    let network: Arc<dyn OutputSink> = if config.output.controllers.is_empty() {
        warn!("No controllers configured; frames will be discarded");
        Arc::new(NullSink::new(total_channels))
    } else {
        Arc::new(UdpSink::new(total_channels, config.output.controllers.clone()))
    };
    let sink = Arc::new(QueuedSink::new(network, config.output.queue_depth));

    let scheduler = Arc::new(
        Scheduler::new(
            sink,
            RendererRegistry::default(),
            Arc::new(EventBus::default()),
            show_dir,
        )
        .with_save_on_exit(config.save_on_exit),
    );
    scheduler.load();
    if let Err(e) = scheduler.start_output() {
        warn!("Output to lights not started: {}", e);
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let pump = FramePump::new(Arc::clone(&scheduler), config.frame_interval()).spawn(stop_rx);

    let served = api::serve(AppContext::new(Arc::clone(&scheduler)), port, shutdown_signal()).await;

    let _ = stop_tx.send(true);
    if let Err(e) = pump.await {
        error!("Frame pump task failed: {}", e);
    }
    scheduler.shutdown();

    served.context("HTTP server failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
