//! Axum route handler for the Parse API.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::handlers::run_blocking;
use crate::models::component::{ComponentKind, ParsedProfile};
use crate::parsing::upload;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub success: bool,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub dimensions: Value,
    pub message: String,
}

/// POST /api/v1/parse
///
/// Accepts a multipart `file` field holding a `.dxf` drawing and returns the
/// recovered profile dimensions (rounded to 2 decimals).
pub async fn handle_parse(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, AppError> {
    let staged = upload::receive(&mut multipart, state.config.upload_max_size_bytes).await?;
    let filename = staged.filename.clone();
    let size = staged.size;

    let service = Arc::clone(&state.service);
    // The temporary file is dropped (and deleted) on the blocking thread.
    let parsed = run_blocking("parse", move || service.parse(staged.path()))
        .await
        .inspect_err(|e| warn!("Parse failed for {filename}: {e}"))?;

    let kind = parsed.kind();
    let dimensions = match parsed {
        ParsedProfile::IBeam(section) => serde_json::to_value(section),
        ParsedProfile::Column(dims) => serde_json::to_value(dims),
    }
    .map_err(|e| AppError::Internal(e.into()))?;

    info!(
        "Successfully parsed {filename} ({size} bytes) as {}",
        kind.type_name()
    );

    Ok(Json(ParseResponse {
        success: true,
        message: format!("Successfully parsed {} from {filename}", kind.type_name()),
        filename,
        kind,
        dimensions,
    }))
}
