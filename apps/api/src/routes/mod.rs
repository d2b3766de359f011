pub mod health;
pub mod metrics;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::generation::handlers as generation;
use crate::parsing::handlers as parsing;
use crate::state::AppState;

/// Slack on top of the upload cap for multipart framing, so the upload check
/// (413 with our error body) trips before axum's own body limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let parse_body_limit = state.config.upload_max_size_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route(metrics::METRICS_PATH, get(health::metrics_handler))
        // Generation API
        .route("/api/v1/ibeam", post(generation::handle_generate_ibeam))
        .route("/api/v1/column", post(generation::handle_generate_column))
        .route("/api/v1/ibeam/batch", post(generation::handle_ibeam_batch))
        .route("/api/v1/column/batch", post(generation::handle_column_batch))
        .route(
            "/api/v1/ibeam/batch/async",
            post(generation::handle_ibeam_batch_async),
        )
        .route(
            "/api/v1/column/batch/async",
            post(generation::handle_column_batch_async),
        )
        .route("/api/v1/cache", delete(generation::handle_clear_caches))
        // Parse API
        .route(
            "/api/v1/parse",
            post(parsing::handle_parse).layer(DefaultBodyLimit::max(parse_body_limit)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics::track_requests,
        ))
        .with_state(state)
}
