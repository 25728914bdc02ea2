/*
[INPUT]:  Public API exports for exchange-stream crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod metrics;
pub mod stream;

// Re-export main types for convenience
pub use config::StreamConfig;
pub use metrics::{StreamMetrics, StreamMetricsSnapshot};
pub use stream::{StreamRunner, warm_cache};
