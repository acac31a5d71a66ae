//! Deterministic gradient-boosted regression trees.
//!
//! Trees are grown leaf-wise on histogram-binned features and fit to the
//! squared-error residuals of the ensemble so far. The model serializes to JSON
//! and reloads without loss.

mod model;
mod train;

pub use model::{GBDT_MODEL_VERSION, GbdtRegressor, RegressionTree, TreeNode};
pub use train::{MIN_TRAINING_ROWS, TrainDataset, TrainOptions, train_gbdt};
