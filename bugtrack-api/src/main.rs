//! # Bugtrack API Server
//!
//! Serves the Bugtrack authorization core over HTTP: identity resolution
//! on every `/v1` request, then authorized reads and writes of users,
//! projects, and bugs.
//!
//! ## Usage
//!
//! ```bash
//! AUTH_JWT_SECRET=$(openssl rand -hex 32) STORE_BACKEND=memory cargo run -p bugtrack-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use bugtrack_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StoreBackend},
};
use bugtrack_shared::{
    auth::verifier::JwtVerifier,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "bugtrack_api=debug,bugtrack_shared=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        "Bugtrack API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let (store, pool): (Arc<dyn Store>, _) = match config.store.backend {
        StoreBackend::Postgres => {
            let pool = create_pool(DatabaseConfig {
                url: config.store.database_url.clone(),
                max_connections: config.store.max_connections,
                ..Default::default()
            })
            .await
            .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            (Arc::new(PgStore::new(pool.clone())), Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            (Arc::new(MemoryStore::new()), None)
        }
    };

    let verifier = JwtVerifier::new(config.auth.jwt_secret.clone(), config.auth.issuer.clone());
    let address = config.bind_address();
    let app = build_router(AppState::new(store, Arc::new(verifier), config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
