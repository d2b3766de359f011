use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Profile drawing API is running"
    }))
}

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}

/// GET /metrics
/// Request counters, per-store cache statistics and executor load.
pub async fn metrics_handler(State(state): State<AppState>) -> Json<Value> {
    let executor = state.service.executor();
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "metrics": state.metrics.snapshot(),
        "caches": state.service.cache_stats(),
        "executor": {
            "workers": executor.worker_count(),
            "submitted": executor.submitted_count()
        }
    }))
}
