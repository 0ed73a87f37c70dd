// API Server Binary Entry Point
//
// Purpose: Start the Axum validation API
// Usage: cargo run --features api --bin api_server

use parcel_validator::{create_router, AppState, EngineConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "parcel_validator=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // Configuration: optional JSON file, then PARCEL_* overrides
    let config_path = std::env::var("PARCEL_CONFIG").ok().map(PathBuf::from);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let config = EngineConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration:");
    tracing::info!("  PARCEL_CONFIG: {:?}", config_path);
    tracing::info!("  model: {:?}", config.model_path);
    tracing::info!("  catalog: {:?}", config.catalog_path);
    tracing::info!("  PORT: {}", port);

    // Catalog CSV parsing and model loading block; keep them off the runtime
    let state = tokio::task::spawn_blocking(move || AppState::new(config)).await??;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
