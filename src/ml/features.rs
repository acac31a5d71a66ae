//! Feature assembly and min-max normalization.
//!
//! Statistics come from the training subset only and are reused unchanged for
//! evaluation and inference rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{PipelineError, PipelineResult};
use crate::schema::{HousingRecord, PREDICTOR_COUNT, Schema};

/// Normalized predictors in schema order.
pub type FeatureVector = [f32; PREDICTOR_COUNT];

/// Unfitted feature pipeline: concatenate predictors, then min-max scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturePipeline;

impl FeaturePipeline {
    /// Learn per-dimension min/max from `train`.
    pub fn fit(train: &Dataset) -> PipelineResult<FittedFeaturePipeline> {
        if train.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot fit normalization statistics on zero training rows".to_string(),
            ));
        }
        let mut mins = [f32::INFINITY; PREDICTOR_COUNT];
        let mut maxs = [f32::NEG_INFINITY; PREDICTOR_COUNT];
        for record in train.records() {
            record.check_predictors(train.schema())?;
            for (j, value) in record.predictors().into_iter().enumerate() {
                mins[j] = mins[j].min(value);
                maxs[j] = maxs[j].max(value);
            }
        }
        debug!("Fitted min-max statistics: mins={mins:?} maxs={maxs:?}");
        Ok(FittedFeaturePipeline {
            schema: train.schema().clone(),
            mins,
            maxs,
        })
    }
}

/// Learned normalization statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedFeaturePipeline {
    schema: Schema,
    mins: FeatureVector,
    maxs: FeatureVector,
}

impl FittedFeaturePipeline {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn mins(&self) -> &FeatureVector {
        &self.mins
    }

    pub fn maxs(&self) -> &FeatureVector {
        &self.maxs
    }

    /// Map a record onto its normalized feature vector.
    ///
    /// Zero-variance dimensions map to `0.0`. Inference values outside the
    /// training range are not clamped.
    pub fn transform(&self, record: &HousingRecord) -> PipelineResult<FeatureVector> {
        record.check_predictors(&self.schema)?;
        Ok(self.scale(record.predictors()))
    }

    /// Transform every record of `dataset`, in order.
    pub fn transform_all(&self, dataset: &Dataset) -> PipelineResult<Vec<FeatureVector>> {
        dataset
            .records()
            .iter()
            .map(|record| self.transform(record))
            .collect()
    }

    fn scale(&self, raw: FeatureVector) -> FeatureVector {
        let mut out = [0.0f32; PREDICTOR_COUNT];
        for (j, value) in raw.into_iter().enumerate() {
            let span = self.maxs[j] - self.mins[j];
            out[j] = if span > 0.0 {
                (value - self.mins[j]) / span
            } else {
                0.0
            };
        }
        out
    }

    /// Check structural invariants after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        for j in 0..PREDICTOR_COUNT {
            let (min, max) = (self.mins[j], self.maxs[j]);
            if !min.is_finite() || !max.is_finite() {
                return Err(format!("dimension {j} has non-finite bounds"));
            }
            if min > max {
                return Err(format!("dimension {j} has min {min} above max {max}"));
            }
        }
        if self.schema.features().count() != PREDICTOR_COUNT {
            return Err("schema does not declare eight predictors".to_string());
        }
        Ok(())
    }
}
