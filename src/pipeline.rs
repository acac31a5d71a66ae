//! End-to-end run: load, split, fit, train, evaluate, persist, reload, predict.

use std::fmt;
use std::path::Path;

use tracing::info;

use crate::config::PipelineConfig;
use crate::dataset::{load_dataset, split_dataset};
use crate::error::PipelineResult;
use crate::ml::{FeaturePipeline, PredictionEngine, RegressionMetrics, evaluate, train_pipeline};
use crate::model_store::{load_pipeline, save_pipeline};
use crate::schema::{HousingPrediction, HousingRecord, Schema};

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Unfit,
    Fitting,
    Fitted,
    Trained,
    Evaluated,
    Persisted,
    Reconstructed,
    Serving,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineStage::Unfit => "unfit",
            PipelineStage::Fitting => "fitting",
            PipelineStage::Fitted => "fitted",
            PipelineStage::Trained => "trained",
            PipelineStage::Evaluated => "evaluated",
            PipelineStage::Persisted => "persisted",
            PipelineStage::Reconstructed => "reconstructed",
            PipelineStage::Serving => "serving",
        };
        f.write_str(label)
    }
}

/// Outcome of [`run_pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub metrics: RegressionMetrics,
    pub prediction: HousingPrediction,
}

/// District used for the post-training smoke prediction.
pub fn sample_record() -> HousingRecord {
    HousingRecord {
        longitude: -122.23,
        latitude: 37.88,
        housing_median_age: 41.0,
        total_rooms: 880.0,
        total_bedrooms: 129.0,
        population: 322.0,
        households: 126.0,
        median_income: 8.3252,
        median_house_value: None,
        ocean_proximity: String::new(),
    }
}

/// Run every stage against `data_path`, writing the artifact to `config.model_path`.
///
/// Scores `sample` with the pipeline reloaded from disk, not the in-memory one.
pub fn run_pipeline(
    config: &PipelineConfig,
    data_path: &Path,
    sample: &HousingRecord,
) -> PipelineResult<PipelineReport> {
    let schema = Schema::housing();
    let mut stage = PipelineStage::Unfit;
    info!("Loading {}", data_path.display());
    let dataset = load_dataset(data_path, &schema)?;
    let split = split_dataset(&dataset, &config.split)?;

    advance(&mut stage, PipelineStage::Fitting);
    let features = FeaturePipeline::fit(&split.train)?;
    advance(&mut stage, PipelineStage::Fitted);

    let trained = train_pipeline(features, &split.train, &config.train)?;
    advance(&mut stage, PipelineStage::Trained);

    let metrics = evaluate(&trained, &split.test)?;
    advance(&mut stage, PipelineStage::Evaluated);

    save_pipeline(&trained, Some(&metrics), &config.model_path)?;
    advance(&mut stage, PipelineStage::Persisted);

    let loaded = load_pipeline(&config.model_path, &schema)?;
    advance(&mut stage, PipelineStage::Reconstructed);

    let engine = PredictionEngine::new(loaded.pipeline);
    advance(&mut stage, PipelineStage::Serving);
    let prediction = engine.predict(sample)?;
    info!("Sample prediction: {:.2}", prediction.median_house_value);

    Ok(PipelineReport {
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        metrics,
        prediction,
    })
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    info!("Pipeline stage {stage} -> {next}");
    *stage = next;
}
