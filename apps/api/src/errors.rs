use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::drawing::DrawingError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing or is not a number.
    #[error("Schema error: '{field}' {reason}")]
    Schema { field: String, reason: String },

    /// A dimension or derived ratio violates an engineering bound.
    #[error("Geometry error: {message}")]
    Geometry { field: String, message: String },

    /// The drawing could not be read at all.
    #[error("Corrupt drawing: {0}")]
    CorruptDrawing(String),

    /// The drawing was read but does not describe a supported profile.
    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),

    #[error("Batch size {actual} exceeds maximum limit of {limit} items")]
    SystemLimit { limit: usize, actual: usize },

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("File exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Drawing error: {0}")]
    Drawing(#[from] DrawingError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn geometry(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Geometry {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Tags a validation error with the position of the offending batch item.
    pub fn at_item(self, index: usize) -> Self {
        match self {
            AppError::Schema { field, reason } => AppError::Schema {
                field: format!("items[{index}].{field}"),
                reason,
            },
            AppError::Geometry { field, message } => AppError::Geometry {
                field: format!("items[{index}].{field}"),
                message: format!("Item {index}: {message}"),
            },
            other => other,
        }
    }

    /// Short error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Schema { .. } => "SCHEMA_ERROR",
            AppError::Geometry { .. } => "GEOMETRY_ERROR",
            AppError::CorruptDrawing(_) => "CORRUPT_DRAWING",
            AppError::UnsupportedShape(_) => "UNSUPPORTED_SHAPE",
            AppError::SystemLimit { .. } => "SYSTEM_LIMIT",
            AppError::UploadRejected(_) => "UPLOAD_REJECTED",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::Io(_) => "IO_ERROR",
            AppError::Drawing(_) => "DRAWING_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Schema { .. }
            | AppError::Geometry { .. }
            | AppError::CorruptDrawing(_)
            | AppError::SystemLimit { .. }
            | AppError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedShape(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Io(_) | AppError::Drawing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Io(e) => {
                tracing::error!("I/O error: {e}");
                "A file system error occurred".to_string()
            }
            AppError::Drawing(e) => {
                tracing::error!("Drawing error: {e}");
                "The drawing could not be produced".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            other => {
                tracing::warn!("Request rejected: {other}");
                other.to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_bad_request() {
        assert_eq!(
            AppError::schema("width", "is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::geometry("height", "too tall").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::SystemLimit { limit: 50, actual: 51 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_parse_errors_are_distinguishable() {
        let corrupt = AppError::CorruptDrawing("bad group code".to_string());
        let unsupported = AppError::UnsupportedShape("8 vertices".to_string());
        assert_ne!(corrupt.error_code(), unsupported.error_code());
        assert_ne!(corrupt.status_code(), unsupported.status_code());
    }

    #[test]
    fn test_system_limit_message_names_both_numbers() {
        let msg = AppError::SystemLimit { limit: 50, actual: 51 }.to_string();
        assert!(msg.contains("51"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn test_at_item_prefixes_validation_errors_only() {
        let schema = AppError::schema("width", "is required").at_item(3);
        assert!(schema.to_string().contains("items[3].width"));

        let geometry = AppError::geometry("height", "too tall").at_item(0);
        assert_eq!(geometry.to_string(), "Geometry error: Item 0: too tall");

        let limit = AppError::SystemLimit { limit: 50, actual: 51 }.at_item(2);
        assert!(matches!(limit, AppError::SystemLimit { .. }));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response =
            AppError::Internal(anyhow::anyhow!("secret connection string")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
