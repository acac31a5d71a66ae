//! Feature normalization, boosted-tree training, evaluation and scoring.

pub mod engine;
pub mod features;
pub mod gbdt;
pub mod metrics;
pub mod trained;

pub use engine::PredictionEngine;
pub use features::{FeaturePipeline, FeatureVector, FittedFeaturePipeline};
pub use metrics::{RegressionMetrics, evaluate};
pub use trained::{TrainedPipeline, train_pipeline};
