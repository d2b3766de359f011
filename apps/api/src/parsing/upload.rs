//! Upload validation and staging.
//!
//! The multipart `file` field is checked by name and content type before any
//! byte is read, then streamed to a temporary file while the size cap is
//! enforced. The temporary file is removed when the returned `Upload` drops.

use std::path::Path;

use axum::extract::Multipart;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::AppError;

pub const FILE_FIELD: &str = "file";
pub const ALLOWED_EXTENSIONS: &[&str] = &["dxf"];
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/dxf",
    "application/x-dxf",
    "image/vnd.dxf",
    "image/x-dxf",
    "application/octet-stream",
    "text/plain",
];

/// A validated upload staged on disk.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub size: usize,
    file: NamedTempFile,
}

impl Upload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Returns the file name with its extension checked against the allow-list.
pub fn validate_filename(filename: Option<&str>) -> Result<String, AppError> {
    let filename = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::UploadRejected("Filename is required".to_string()))?;

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| AppError::UploadRejected("Filename must have an extension".to_string()))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::UploadRejected(format!(
            "Invalid file type: .{extension}. Allowed: {}",
            allowed_extensions()
        )));
    }

    Ok(filename.to_string())
}

/// A missing content type is accepted; a present one must be on the allow-list.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), AppError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if !ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
        return Err(AppError::UploadRejected(format!(
            "Invalid content type: {content_type}. Allowed: {}",
            ALLOWED_CONTENT_TYPES.join(", ")
        )));
    }
    Ok(())
}

/// Finds the `file` field, validates it and streams it to a temporary file.
pub async fn receive(multipart: &mut Multipart, max_bytes: usize) -> Result<Upload, AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = validate_filename(field.file_name())?;
        validate_content_type(field.content_type())?;

        let file = tempfile::Builder::new()
            .prefix("upload_")
            .suffix(".dxf")
            .tempfile()?;
        let mut writer = tokio::fs::File::from_std(file.reopen()?);

        let mut size = 0usize;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len();
            if size > max_bytes {
                // `file` drops here and takes the partial upload with it.
                return Err(AppError::PayloadTooLarge { limit: max_bytes });
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        debug!("Staged upload {filename} ({size} bytes) at {}", file.path().display());
        return Ok(Upload {
            filename,
            size,
            file,
        });
    }

    Err(AppError::UploadRejected(format!(
        "Multipart field '{FILE_FIELD}' is required"
    )))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::UploadRejected(format!("Invalid multipart body: {e}"))
}

fn allowed_extensions() -> String {
    ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dxf_extension_is_accepted_case_insensitively() {
        assert_eq!(validate_filename(Some("beam.DXF")).unwrap(), "beam.DXF");
        assert_eq!(validate_filename(Some("column.dxf")).unwrap(), "column.dxf");
    }

    #[test]
    fn test_other_extensions_are_rejected() {
        let err = validate_filename(Some("drawing.dwg")).unwrap_err();
        assert!(matches!(err, AppError::UploadRejected(_)));
        assert!(err.to_string().contains(".dwg"));
    }

    #[test]
    fn test_missing_name_or_extension_is_rejected() {
        assert!(validate_filename(None).is_err());
        assert!(validate_filename(Some("  ")).is_err());
        assert!(validate_filename(Some("drawing")).is_err());
    }

    #[test]
    fn test_content_type_allow_list() {
        assert!(validate_content_type(None).is_ok());
        assert!(validate_content_type(Some("application/dxf")).is_ok());
        assert!(validate_content_type(Some("text/plain; charset=utf-8")).is_ok());
        assert!(validate_content_type(Some("image/png")).is_err());
    }
}
