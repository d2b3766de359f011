use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::DrawingError;

/// One named file inside a packaged archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Bytes,
}

/// Packs generated drawings into a single downloadable file.
pub trait ArchivePackager: Send + Sync {
    fn package(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, DrawingError>;

    fn media_type(&self) -> &'static str;

    fn extension(&self) -> &'static str;
}

/// Deflate-compressed zip archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager;

impl ArchivePackager for ZipPackager {
    fn package(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, DrawingError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| DrawingError::Archive(format!("{}: {e}", entry.name)))?;
            writer.write_all(&entry.content)?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| DrawingError::Archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    fn media_type(&self) -> &'static str {
        "application/zip"
    }

    fn extension(&self) -> &'static str {
        "zip"
    }
}
