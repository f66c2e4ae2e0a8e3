use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::info;

mod api;
mod auth;
mod config;
mod db;
mod embeddings;
mod error;
mod gateway;
mod mailer;
mod service;
mod websocket;

use crate::config::RuntimeConfig;
use crate::db::Database;
use crate::service::MentoraService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Mentora service v{}", env!("CARGO_PKG_VERSION"));

    // Load static configuration first to know where the database is
    let static_config = config::load_static_config()?;

    info!(
        host = %static_config.server.host,
        port = static_config.server.port,
        "Static configuration loaded"
    );

    // Ensure data directory exists
    std::fs::create_dir_all(&static_config.storage.data_dir)?;

    // Initialize database
    let db_path = static_config.storage.data_dir.join("mentora.db");
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    // Load runtime config (static + dynamic with DB overrides)
    let runtime_config = Arc::new(RuntimeConfig::load(&db)?);
    info!("Runtime configuration loaded with DB settings");

    // Install the Prometheus recorder before anything increments counters
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    // Initialize the service
    let service = Arc::new(MentoraService::new(db, runtime_config.clone()).await?);

    // Build the router
    let app = api::router(service.clone(), metrics_handle);

    // Start the background job workers
    MentoraService::start_email_worker(service.clone());
    MentoraService::start_embedding_worker(service.clone());

    // Start expired-token cleanup background task
    let cleanup_service = service.clone();
    let cleanup_interval = runtime_config.dynamic().auth.token_cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            match cleanup_service.db.cleanup_expired_tokens() {
                Ok(count) if count > 0 => {
                    info!(removed = count, "Cleaned up expired auth tokens");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Token cleanup failed");
                }
                _ => {}
            }
        }
    });

    // Start the server
    let addr = format!(
        "{}:{}",
        runtime_config.static_config.server.host, runtime_config.static_config.server.port
    );
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mentora_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
