// Drawing parsing over HTTP: upload checks, temp-file staging, and the parse handler.
// Inference itself lives in the facade (`DrawingService::parse`).

pub mod handlers;
pub mod upload;
