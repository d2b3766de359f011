mod cache;
mod config;
mod drawing;
mod errors;
mod executor;
mod generation;
mod geometry;
mod models;
mod parsing;
mod routes;
mod state;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::drawing::{DxfCodec, ZipPackager};
use crate::executor::BatchExecutor;
use crate::generation::DrawingService;
use crate::routes::build_router;
use crate::routes::metrics::RequestMetrics;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparsable env values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},tower_http={level}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting profile API v{}", env!("CARGO_PKG_VERSION"));

    // Output directory for fire-and-forget batches
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    info!("Batch output directory: {}", config.output_dir.display());

    // Initialize the batch executor (worker pool sized by MAX_THREADS)
    let executor = Arc::new(BatchExecutor::start(config.max_threads));

    // Build the facade: DXF codec, zip packager, three caches
    let service = Arc::new(DrawingService::new(
        &config,
        Arc::new(DxfCodec::new()),
        Arc::new(ZipPackager),
        executor,
    ));
    info!(
        "Caches sized generation={} parse={} batch={}; batch limit {}",
        config.generation_cache_size,
        config.parse_cache_size,
        config.batch_cache_size,
        config.limits.max_batch_size
    );

    // Build app state
    let state = AppState {
        service: Arc::clone(&service),
        config: config.clone(),
        metrics: Arc::new(RequestMetrics::new()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let queued batch items finish writing before exit
    service.shutdown(true).await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
