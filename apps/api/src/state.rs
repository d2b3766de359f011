use std::sync::Arc;

use crate::config::Config;
use crate::generation::DrawingService;
use crate::routes::metrics::RequestMetrics;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Facade owning the caches, codec, packager and batch executor.
    pub service: Arc<DrawingService>,
    pub config: Config,
    pub metrics: Arc<RequestMetrics>,
}
