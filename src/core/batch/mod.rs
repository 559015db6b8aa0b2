//! Batch processing layer: per-user engine, adaptive sizing, model warm-up.

pub mod engine;
pub mod preloader;
pub mod sizer;

pub use engine::{BatchEngine, ProcessFolderOptions, ProgressCallback};
pub use preloader::ModelPreloader;
pub use sizer::AdaptiveBatchSizer;
