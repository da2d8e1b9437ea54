//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, PolicyTable, RedisCache, S3MediaStorage, SmtpMailer},
    config::Config,
    error::ApiError,
    token::JwtCodec,
    web::{router, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.pg_pool_max)
        .connect(&config.database_url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool);
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let cache = RedisCache::connect(&config.redis_url)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to connect to redis: {}", e)))?;
    let mailer = SmtpMailer::new(&config.smtp)?;
    let media = S3MediaStorage::new(&config.media)?;
    let policy = PolicyTable::load(&config.policy_path)?;
    if policy.is_empty() {
        warn!("Policy table at {} has no rules; every request will be denied", config.policy_path.display());
    }
    info!(rules = policy.len(), "Policy table loaded");

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        repos: db_adapter.into_repositories(),
        cache: Arc::new(cache),
        mailer: Arc::new(mailer),
        media: Arc::new(media),
        policy: Arc::new(policy),
        tokens: JwtCodec::new(&config.jwt),
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let app = router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped.");
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where signals exist.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections...");
}
