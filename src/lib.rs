//! Housing median-value regression: CSV ingestion, gradient-boosted trees,
//! evaluation and a portable model artifact.

/// Application directory helpers.
pub mod app_dirs;
/// `homeval.toml` configuration.
pub mod config;
/// Dataset loading and train/test partitioning.
pub mod dataset;
/// Shared error types.
pub mod error;
mod fs_ops;
/// Logging setup for the binary.
pub mod logging;
/// Feature normalization, boosting, metrics and inference.
pub mod ml;
/// Zip artifact persistence.
pub mod model_store;
/// Stage orchestration.
pub mod pipeline;
/// Input file discovery.
pub mod resolve;
/// Column schema and record types.
pub mod schema;

pub use error::{PipelineError, PipelineResult};
