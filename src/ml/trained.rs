//! Trainer stage: fitted normalization + boosted trees as one scoring unit.

use tracing::info;

use crate::dataset::Dataset;
use crate::error::{PipelineError, PipelineResult};
use crate::schema::{HousingPrediction, HousingRecord, PREDICTOR_COUNT, Schema};

use super::features::FittedFeaturePipeline;
use super::gbdt::{GbdtRegressor, TrainDataset, TrainOptions, train_gbdt};

/// Normalization statistics together with the model trained on their output.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedPipeline {
    features: FittedFeaturePipeline,
    model: GbdtRegressor,
}

impl TrainedPipeline {
    /// Pair already-validated parts, checking that their dimensions agree.
    pub fn from_parts(
        features: FittedFeaturePipeline,
        model: GbdtRegressor,
    ) -> Result<Self, String> {
        if model.feature_len != PREDICTOR_COUNT {
            return Err(format!(
                "model expects {} features, pipeline produces {PREDICTOR_COUNT}",
                model.feature_len
            ));
        }
        Ok(Self { features, model })
    }

    pub fn features(&self) -> &FittedFeaturePipeline {
        &self.features
    }

    pub fn model(&self) -> &GbdtRegressor {
        &self.model
    }

    pub fn schema(&self) -> &Schema {
        self.features.schema()
    }

    /// Transform then score one record. The target field is ignored.
    pub fn predict(&self, record: &HousingRecord) -> PipelineResult<HousingPrediction> {
        let features = self.features.transform(record)?;
        Ok(HousingPrediction {
            median_house_value: self.model.predict(&features),
        })
    }
}

/// Fit the boosted-tree model on `train`, normalized through `features`.
///
/// Every training row must carry a target.
pub fn train_pipeline(
    features: FittedFeaturePipeline,
    train: &Dataset,
    options: &TrainOptions,
) -> PipelineResult<TrainedPipeline> {
    let mut y = Vec::with_capacity(train.len());
    for (idx, target) in train.targets().enumerate() {
        let Some(target) = target else {
            return Err(PipelineError::Training(format!(
                "training row {} has no medianHouseValue",
                idx + 1
            )));
        };
        y.push(target);
    }
    let x = features
        .transform_all(train)?
        .into_iter()
        .map(|row| row.to_vec())
        .collect();
    let dataset = TrainDataset {
        feature_len: PREDICTOR_COUNT,
        x,
        y,
    };
    let model = train_gbdt(&dataset, options)?;
    info!(
        "Trained {} trees (up to {} leaves each) on {} rows",
        model.trees.len(),
        options.num_leaves,
        dataset.x.len()
    );
    TrainedPipeline::from_parts(features, model).map_err(PipelineError::Training)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::FeaturePipeline;

    fn uniform_dataset(rows: &[(f32, f32)]) -> Dataset {
        Dataset::new(
            Schema::housing(),
            rows.iter()
                .map(|&(v, target)| {
                    HousingRecord::from_predictors([v; PREDICTOR_COUNT], Some(target))
                })
                .collect(),
        )
    }

    #[test]
    fn three_row_scenario_predicts_middle_value() {
        let train = uniform_dataset(&[(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)]);
        let features = FeaturePipeline::fit(&train).unwrap();
        let pipeline = train_pipeline(features, &train, &TrainOptions::default()).unwrap();
        let query = HousingRecord::from_predictors([2.0; PREDICTOR_COUNT], None);
        let prediction = pipeline.predict(&query).unwrap();
        assert!((prediction.median_house_value - 20.0).abs() < 1.0);
    }

    #[test]
    fn missing_target_is_a_training_error() {
        let mut train = uniform_dataset(&[(1.0, 10.0), (2.0, 20.0)]);
        let features = FeaturePipeline::fit(&train).unwrap();
        let mut records = train.records().to_vec();
        records[1].median_house_value = None;
        train = Dataset::new(Schema::housing(), records);
        let err = train_pipeline(features, &train, &TrainOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn single_row_is_a_training_error() {
        let train = uniform_dataset(&[(1.0, 10.0)]);
        let features = FeaturePipeline::fit(&train).unwrap();
        let err = train_pipeline(features, &train, &TrainOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }
}
