//! Single-record inference over a reconstructed pipeline.

use std::sync::Arc;

use crate::error::PipelineResult;
use crate::schema::{HousingPrediction, HousingRecord};

use super::trained::TrainedPipeline;

/// Read-only scorer; clones share the same pipeline.
///
/// Holds no mutable state, so it can be used from many threads at once.
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    pipeline: Arc<TrainedPipeline>,
}

impl PredictionEngine {
    pub fn new(pipeline: TrainedPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &TrainedPipeline {
        &self.pipeline
    }

    pub fn predict(&self, record: &HousingRecord) -> PipelineResult<HousingPrediction> {
        self.pipeline.predict(record)
    }

    /// Parse a delimited row (target column optional) and score it.
    pub fn predict_row(&self, cells: &[&str]) -> PipelineResult<HousingPrediction> {
        let record = HousingRecord::parse_row(self.pipeline.schema(), cells, None, None, false)?;
        self.predict(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::error::PipelineError;
    use crate::ml::features::FeaturePipeline;
    use crate::ml::gbdt::TrainOptions;
    use crate::ml::trained::train_pipeline;
    use crate::schema::{PREDICTOR_COUNT, Schema};

    fn engine() -> PredictionEngine {
        let records = (0..60)
            .map(|i| {
                let v = i as f32;
                HousingRecord::from_predictors([v; PREDICTOR_COUNT], Some(1000.0 + 10.0 * v))
            })
            .collect();
        let train = Dataset::new(Schema::housing(), records);
        let features = FeaturePipeline::fit(&train).unwrap();
        PredictionEngine::new(train_pipeline(features, &train, &TrainOptions::default()).unwrap())
    }

    #[test]
    fn concurrent_predictions_agree() {
        let engine = engine();
        let record = HousingRecord::from_predictors([30.0; PREDICTOR_COUNT], None);
        let expected = engine.predict(&record).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let engine = engine.clone();
                    let record = record.clone();
                    scope.spawn(move || engine.predict(&record).unwrap())
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn predict_row_does_not_need_target() {
        let engine = engine();
        let cells = ["30"; PREDICTOR_COUNT];
        let from_row = engine.predict_row(&cells).unwrap();
        let from_record = engine
            .predict(&HousingRecord::from_predictors([30.0; PREDICTOR_COUNT], None))
            .unwrap();
        assert_eq!(from_row, from_record);
    }

    #[test]
    fn predict_row_missing_predictor_fails() {
        let engine = engine();
        let cells = ["30"; PREDICTOR_COUNT - 1];
        let err = engine.predict_row(&cells).unwrap_err();
        match err {
            PipelineError::DataFormat { message, .. } => {
                assert!(message.contains("medianIncome"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
