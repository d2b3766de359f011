// Generation/Parsing Facade and the HTTP surface for drawing generation.
// Validation, profile building, caching and background batches meet in `service`;
// handlers only extract, hop onto the blocking pool and frame the response.

pub mod handlers;
pub mod service;

pub use service::DrawingService;
