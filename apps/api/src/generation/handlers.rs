//! Axum route handlers for the Generation API.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::service::Generated;
use crate::models::component::ComponentKind;
use crate::state::AppState;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_SECTION_AREA: HeaderName = HeaderName::from_static("x-section-area-mm2");

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Items stay raw JSON so the schema phase reports missing or non-numeric fields.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct BatchAcceptedResponse {
    pub batch_id: Uuid,
    pub output_dir: String,
    /// Files already written from cache.
    pub ready: Vec<String>,
    /// Items still being generated in the background.
    pub queued: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: Vec<&'static str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ibeam
///
/// Validates one I-beam and returns its DXF drawing. `length` defaults to 1000 mm.
pub async fn handle_generate_ibeam(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<Response, AppError> {
    generate_single(&state, ComponentKind::IBeam, raw).await
}

/// POST /api/v1/column
pub async fn handle_generate_column(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<Response, AppError> {
    generate_single(&state, ComponentKind::Column, raw).await
}

/// POST /api/v1/ibeam/batch
///
/// Returns every item packaged in one archive. Blocks until all members exist.
pub async fn handle_ibeam_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Response, AppError> {
    batch_archive(&state, ComponentKind::IBeam, request.items).await
}

/// POST /api/v1/column/batch
pub async fn handle_column_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Response, AppError> {
    batch_archive(&state, ComponentKind::Column, request.items).await
}

/// POST /api/v1/ibeam/batch/async
///
/// Fire-and-forget: cached items are written immediately, the rest are queued
/// on the batch executor. Files land under `DXF_OUTPUT_DIR/<batch_id>/`.
pub async fn handle_ibeam_batch_async(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<(StatusCode, Json<BatchAcceptedResponse>), AppError> {
    batch_async(&state, ComponentKind::IBeam, request.items).await
}

/// POST /api/v1/column/batch/async
pub async fn handle_column_batch_async(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<(StatusCode, Json<BatchAcceptedResponse>), AppError> {
    batch_async(&state, ComponentKind::Column, request.items).await
}

/// DELETE /api/v1/cache
pub async fn handle_clear_caches(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    state.service.clear_caches();
    Json(ClearCacheResponse {
        cleared: vec!["generation", "parse", "batch"],
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Shared plumbing
// ────────────────────────────────────────────────────────────────────────────

async fn generate_single(
    state: &AppState,
    kind: ComponentKind,
    raw: Value,
) -> Result<Response, AppError> {
    let service = Arc::clone(&state.service);
    let (spec, generated) = run_blocking("generation", move || {
        let spec = service.validate(kind, &raw)?;
        let generated = service.generate(&spec)?;
        Ok((spec, generated))
    })
    .await?;

    let filename = format!(
        "{}.{}",
        spec.display_stem(),
        state.service.drawing_extension()
    );
    let mut response = attachment(state.service.drawing_media_type(), &filename, generated)?;
    response.headers_mut().insert(
        X_SECTION_AREA,
        header_value(&format!("{:.2}", spec.area()))?,
    );
    Ok(response)
}

async fn batch_archive(
    state: &AppState,
    kind: ComponentKind,
    items: Vec<Value>,
) -> Result<Response, AppError> {
    let count = items.len();
    let service = Arc::clone(&state.service);
    let generated = run_blocking("batch archive", move || {
        let specs = service.validate_batch(kind, &items)?;
        service.get_or_compute_batch_archive(&specs)
    })
    .await?;

    tracing::info!(
        "Batch archive for {count} {} items ({})",
        kind.slug(),
        generated.cache.as_header()
    );

    let filename = format!(
        "{}_batch.{}",
        kind.slug(),
        state.service.archive_extension()
    );
    attachment(state.service.archive_media_type(), &filename, generated)
}

async fn batch_async(
    state: &AppState,
    kind: ComponentKind,
    items: Vec<Value>,
) -> Result<(StatusCode, Json<BatchAcceptedResponse>), AppError> {
    let batch_id = Uuid::new_v4();
    let dir = state.config.output_dir.join(batch_id.to_string());

    let service = Arc::clone(&state.service);
    let batch_dir = dir.clone();
    let submission = run_blocking("batch submission", move || {
        let specs = service.validate_batch(kind, &items)?;
        let extension = service.drawing_extension();
        let jobs = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let path = batch_dir.join(format!("{}.{extension}", spec.batch_stem(i)));
                (spec, path)
            })
            .collect();
        service.generate_batch(jobs)
    })
    .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchAcceptedResponse {
            batch_id,
            output_dir: dir.display().to_string(),
            ready: submission
                .ready
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            queued: submission.queued,
        }),
    ))
}

/// Runs facade work on the blocking pool. Codec and file I/O never run on the
/// async workers.
pub(crate) async fn run_blocking<T, F>(what: &'static str, work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        AppError::Internal(anyhow::anyhow!("spawn_blocking failed in {what}: {e}"))
    })?
}

fn attachment(
    media_type: &'static str,
    filename: &str,
    generated: Generated,
) -> Result<Response, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(media_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(&format!("attachment; filename=\"{filename}\""))?,
    );
    headers.insert(X_CACHE, HeaderValue::from_static(generated.cache.as_header()));
    Ok((headers, generated.content).into_response())
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid header value '{value}': {e}")))
}
