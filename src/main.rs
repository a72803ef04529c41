//! giveawayd - timed give-away campaign daemon.
//!
//! Reads platform events as JSON lines on stdin and writes render
//! instructions and interaction replies as JSON lines on stdout.

use chrono::Utc;
use giveawayd::config::{self, Config};
use giveawayd::db::Database;
use giveawayd::engine::Engine;
use giveawayd::gateway::ConsoleGateway;
use giveawayd::scheduler::CloseScheduler;
use giveawayd::state::Registry;
use giveawayd::store::GiveawayStore;
use giveawayd::{feed, http, metrics};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the event feed
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(config::ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %config_path, "Config file not found, using defaults");
            Config::default()
        }
        Err(e) => {
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    info!(
        server = %config.server.name,
        database = %config.database.path,
        "Starting giveawayd"
    );

    metrics::init();

    let db = Database::new(&config.database.path).await?;
    let store: Arc<dyn GiveawayStore> = Arc::new(db);
    let registry = Arc::new(Registry::new(store));
    let scheduler = Arc::new(CloseScheduler::new());

    let (render_tx, render_rx) = mpsc::channel(1024);
    let gateway = Arc::new(ConsoleGateway::new(render_tx));

    let engine = Arc::new(Engine::new(
        registry,
        Arc::clone(&scheduler),
        gateway.clone(),
        config.giveaway.policy(),
    ));

    let restored = engine.restore(Utc::now()).await?;
    info!(count = restored, "Restored active giveaways");

    {
        let engine = Arc::clone(&engine);
        tokio::spawn(scheduler.run(move |id| {
            let engine = Arc::clone(&engine);
            async move {
                engine.close(&id).await;
            }
        }));
    }

    if config.server.metrics_port != 0 {
        tokio::spawn(http::run_http_server(config.server.metrics_port));
    }

    let writer = feed::run(
        Arc::clone(&engine),
        gateway,
        render_rx,
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await;

    // Input is closed but armed closes still fire until shutdown
    info!("Waiting for shutdown signal");
    shutdown_signal().await?;
    info!("Shutting down");
    writer.abort();
    Ok(())
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
