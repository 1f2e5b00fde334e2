//! Showcase backend entry point
//!
//! Serves the REST API under /api and the single-page frontend from the
//! configured static directory.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showcase::config::{Config, DEV_SECRET_PREFIX, LogFormat};
use showcase::db::Database;
use showcase::{AppState, build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "showcase=debug,tower_http=info".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Showcase");
    if config.jwt_secret.starts_with(DEV_SECRET_PREFIX) {
        tracing::warn!("JWT_SECRET not set, using a generated development secret");
    }

    let db = Database::connect(&config.database_url, config.database_max_connections).await?;
    db.migrate().await?;
    tracing::info!("Database migrations applied");

    if config.seed_on_startup {
        db.seed().await.context("Failed to seed catalog")?;
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let app = build_app(AppState::new(config, db));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
