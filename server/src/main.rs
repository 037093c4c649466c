//! Guestlist server.
//!
//! This binary:
//! - Loads configuration from the environment and `.env`
//! - Connects to `PostgreSQL` and applies migrations
//! - Installs the Prometheus recorder and serves `/metrics`
//! - Serves the public RSVP links, the check-in scanner and the organizer API
//! - Drains in-flight requests on Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/guestlist cargo run -p guestlist-server
//! ```

mod config;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::get};
use guestlist_postgres::{PostgresAccessControl, PostgresRepository};
use guestlist_runtime::metrics::MetricsServer;
use guestlist_runtime::{Dispatcher, GuestlistEnvironment};
use guestlist_web::{AppState, router};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DatabaseConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,guestlist=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        addr = %config.server.addr(),
        notify_mode = ?config.notifications.mode,
        landing = config.rsvp.landing_url.as_deref().unwrap_or("-"),
        "Configuration loaded"
    );

    let repository = connect(&config.database).await?;
    repository.migrate().await.context("database migration failed")?;
    info!("Database ready");

    let mut metrics = MetricsServer::new(config.server.metrics_addr());
    metrics.start()?;
    if let Some(handle) = metrics.handle().cloned() {
        let addr = metrics.addr();
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(addr, handle).await {
                warn!(error = %e, "Metrics listener stopped");
            }
        });
    }

    let notifier = config.notifications.build()?;
    let dispatcher = Dispatcher::new(notifier)
        .with_timeout(config.notifications.timeout())
        .with_mode(config.notifications.dispatch_mode());
    let environment = GuestlistEnvironment::new(repository.clone(), dispatcher)
        .with_settings(config.rsvp.settings())
        .with_public_base_url(config.rsvp.public_base_url.clone());

    let access = PostgresAccessControl::new(repository.pool().clone());
    let mut state = AppState::new(environment, access);
    if let Some(landing) = &config.rsvp.landing_url {
        state = state.with_landing_url(landing.clone());
    }

    let listener = TcpListener::bind(config.server.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.server.addr()))?;
    info!(addr = %config.server.addr(), "HTTP server listening");

    let shutdown = Arc::new(Notify::new());
    let server = tokio::spawn(
        axum::serve(listener, router(state))
            .with_graceful_shutdown({
                let shutdown = Arc::clone(&shutdown);
                async move { shutdown.notified().await }
            })
            .into_future(),
    );

    shutdown_signal().await;
    shutdown.notify_one();

    match tokio::time::timeout(config.server.shutdown_timeout(), server).await {
        Ok(joined) => joined.context("HTTP server task failed")??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Shutdown timed out with requests still in flight"
        ),
    }

    info!("Shutdown complete");
    Ok(())
}

async fn connect(database: &DatabaseConfig) -> anyhow::Result<PostgresRepository> {
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .min_connections(database.min_connections)
        .acquire_timeout(Duration::from_secs(database.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(database.idle_timeout_secs))
        .connect(&database.url)
        .await
        .context("failed to connect to PostgreSQL")?;
    Ok(PostgresRepository::new(pool))
}

async fn serve_metrics(
    addr: SocketAddr,
    handle: metrics_exporter_prometheus::PrometheusHandle,
) -> std::io::Result<()> {
    let app = Router::new().route("/metrics", get(move || async move { handle.render() }));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics available at /metrics");
    axum::serve(listener, app).await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
