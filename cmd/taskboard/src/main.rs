//! # taskboard
//!
//! Assembles the store, identity provider and HTTP router selected by
//! configuration and compile-time features.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::AppState;
use auth_adapters::JwtIdentity;
use configs::{AppConfig, DatabaseBackend, LogConfig, LogFormat};
use services::SharedStore;
use storage_adapters::MemoryStore;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-sqlite")]
use storage_adapters::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);

    // 1. Store
    let store = open_store(&config).await?;

    // 2. Identity
    let identity = JwtIdentity::new(&config.auth.jwt_secret, config.auth.issuer.clone(), config.auth.token_ttl_secs)
        .context("failed to build token verifier")?;

    // 3. Router
    let state = AppState::new(store, Arc::new(identity), &config.server.login_url);
    let app = api_adapters::router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr()))?;
    tracing::info!(addr = %listener.local_addr()?, backend = ?config.database.backend, "taskboard listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("taskboard stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    match config.database.backend {
        DatabaseBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "db-sqlite")]
        DatabaseBackend::Sqlite => {
            let store = SqliteStore::open(&config.database.url, config.database.max_connections)
                .await
                .with_context(|| format!("failed to open {}", config.database.url))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "db-sqlite"))]
        DatabaseBackend::Sqlite => anyhow::bail!("built without the db-sqlite feature"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received ctrl-c, shutting down gracefully");
}
