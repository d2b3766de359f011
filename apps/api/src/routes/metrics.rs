//! In-process request metrics and the middleware that feeds them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Requests to this path are served but not counted.
pub const METRICS_PATH: &str = "/metrics";

#[derive(Debug, Default)]
pub struct RequestMetrics {
    total_requests: AtomicU64,
    total_failures: AtomicU64,
    total_processing_micros: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_failures: u64,
    pub avg_response_time_ms: f64,
    pub total_processing_time_ms: f64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any status >= 400 counts as a failure.
    pub fn record(&self, status: u16, elapsed_micros: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_processing_micros
            .fetch_add(elapsed_micros, Ordering::Relaxed);
        if status >= 400 {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_ms = self.total_processing_micros.load(Ordering::Relaxed) as f64 / 1000.0;
        MetricsSnapshot {
            total_requests,
            total_failures: self.total_failures.load(Ordering::Relaxed),
            avg_response_time_ms: if total_requests > 0 {
                total_ms / total_requests as f64
            } else {
                0.0
            },
            total_processing_time_ms: total_ms,
        }
    }
}

/// Times every request, logs it at a level matching its status and records it.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    debug!("Incoming {method} {path}");

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed();

    let status = response.status();
    if path != METRICS_PATH {
        state
            .metrics
            .record(status.as_u16(), elapsed.as_micros() as u64);
    }

    let ms = elapsed.as_secs_f64() * 1000.0;
    if status.is_server_error() {
        error!("{method} {path} - {} ({ms:.2}ms)", status.as_u16());
    } else if status.is_client_error() {
        warn!("{method} {path} - {} ({ms:.2}ms)", status.as_u16());
    } else {
        info!("{method} {path} - {} ({ms:.2}ms)", status.as_u16());
    }

    response
}
