//! Evaluation metrics for regression models.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{PipelineError, PipelineResult};

use super::trained::TrainedPipeline;

/// Accuracy of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean squared error.
    pub mse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination; `None` when every actual value is identical.
    pub r_squared: Option<f64>,
    /// Number of rows scored.
    pub count: usize,
}

/// Compute metrics from aligned `(prediction, actual)` pairs.
pub fn regression_metrics(pairs: &[(f64, f64)]) -> PipelineResult<RegressionMetrics> {
    if pairs.is_empty() {
        return Err(PipelineError::EmptyDataset(
            "cannot evaluate on zero rows".to_string(),
        ));
    }
    let n = pairs.len() as f64;
    let mean_actual = pairs.iter().map(|(_, actual)| actual).sum::<f64>() / n;
    let mut ss_res = 0f64;
    let mut ss_tot = 0f64;
    let mut abs_sum = 0f64;
    for &(predicted, actual) in pairs {
        let residual = predicted - actual;
        ss_res += residual * residual;
        abs_sum += residual.abs();
        let centered = actual - mean_actual;
        ss_tot += centered * centered;
    }
    let mse = ss_res / n;
    let r_squared = if ss_tot > 0.0 {
        Some(1.0 - ss_res / ss_tot)
    } else {
        None
    };
    Ok(RegressionMetrics {
        rmse: mse.sqrt(),
        mse,
        mae: abs_sum / n,
        r_squared,
        count: pairs.len(),
    })
}

/// Score every row of `test` and compare against its target.
pub fn evaluate(pipeline: &TrainedPipeline, test: &Dataset) -> PipelineResult<RegressionMetrics> {
    let mut pairs = Vec::with_capacity(test.len());
    for (idx, record) in test.records().iter().enumerate() {
        let Some(actual) = record.median_house_value else {
            return Err(PipelineError::data_format(
                None,
                Some(idx + 1),
                "evaluation row has no medianHouseValue",
            ));
        };
        let predicted = pipeline.predict(record)?.median_house_value;
        pairs.push((predicted as f64, actual as f64));
    }
    let metrics = regression_metrics(&pairs)?;
    info!(
        "Evaluated {} rows: rmse={:.4} r2={}",
        metrics.count,
        metrics.rmse,
        format_r_squared(metrics.r_squared)
    );
    Ok(metrics)
}

/// Render R² for display, `NaN` when undefined.
pub fn format_r_squared(value: Option<f64>) -> String {
    value
        .map(|r2| format!("{r2:.4}"))
        .unwrap_or_else(|| "NaN".to_string())
}
