// Drawing I/O seams: the vector-drawing codec and the archive packager.
// The facade only sees the traits; `AppState` carries the concrete backends.

pub mod archive;
pub mod dxf;

use thiserror::Error;

use crate::geometry::Point;

pub use archive::{ArchiveEntry, ArchivePackager, ZipPackager};
pub use dxf::DxfCodec;

#[derive(Debug, Error)]
pub enum DrawingError {
    /// The bytes are not a readable drawing.
    #[error("malformed drawing: {0}")]
    Malformed(String),

    /// The drawing is readable but holds no polyline.
    #[error("no closed polyline found in drawing")]
    NoPolyline,

    #[error("archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque polygon-list ⇄ file-bytes transform.
///
/// `decode(encode(v))` must return `v` up to floating-point rounding.
pub trait DrawingCodec: Send + Sync {
    /// Serializes one closed outline.
    fn encode(&self, vertices: &[Point]) -> Result<Vec<u8>, DrawingError>;

    /// Returns the vertices of the first polyline in the drawing.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Point>, DrawingError>;

    /// MIME type of the encoded output.
    fn media_type(&self) -> &'static str;

    /// File extension, without the dot.
    fn extension(&self) -> &'static str;
}
