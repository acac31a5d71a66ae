mod support;

use homeval::PipelineError;
use homeval::config::{self, PipelineConfig};
use homeval::dataset::{SplitOptions, load_dataset, split_dataset};
use homeval::ml::{FeaturePipeline, PredictionEngine, evaluate, train_pipeline};
use homeval::model_store::load_pipeline;
use homeval::pipeline::{run_pipeline, sample_record};
use homeval::schema::{HousingRecord, Schema};
use support::homeval_env::HomevalEnvGuard;
use support::housing_csv::{HEADER, linear_rows, linear_value, write_csv};
use tempfile::tempdir;

fn config_in(dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        model_path: dir.join("out").join("model.zip"),
        ..PipelineConfig::default()
    }
}

#[test]
fn linear_target_is_learned_closely() {
    let dir = tempdir().unwrap();
    let data = write_csv(dir.path(), "data.csv", &linear_rows(1_000, 11));
    let schema = Schema::housing();
    let dataset = load_dataset(&data, &schema).unwrap();
    assert_eq!(dataset.len(), 1_000);

    let split = split_dataset(&dataset, &SplitOptions::default()).unwrap();
    assert_eq!(split.train.len(), 800);
    assert_eq!(split.test.len(), 200);

    let features = FeaturePipeline::fit(&split.train).unwrap();
    let trained =
        train_pipeline(features, &split.train, &PipelineConfig::default().train).unwrap();
    let metrics = evaluate(&trained, &split.test).unwrap();
    assert_eq!(metrics.count, 200);
    let r_squared = metrics.r_squared.unwrap();
    assert!(r_squared > 0.95, "r_squared {r_squared}");

    let spread = linear_value(15.0, 52.0) - linear_value(0.5, 1.0);
    assert!(
        metrics.rmse < 0.1 * spread as f64,
        "rmse {} vs spread {spread}",
        metrics.rmse
    );
}

#[test]
fn run_pipeline_persists_and_scores_from_reloaded_artifact() {
    let dir = tempdir().unwrap();
    let data = write_csv(dir.path(), "data.csv", &linear_rows(400, 3));
    let config = config_in(dir.path());

    let report = run_pipeline(&config, &data, &sample_record()).unwrap();
    assert_eq!(report.train_rows + report.test_rows, 400);
    assert_eq!(report.test_rows, 80);
    assert!(config.model_path.is_file());
    assert!(report.prediction.median_house_value.is_finite());

    let loaded = load_pipeline(&config.model_path, &Schema::housing()).unwrap();
    assert_eq!(loaded.manifest.metrics, Some(report.metrics));
    let engine = PredictionEngine::new(loaded.pipeline);
    assert_eq!(engine.predict(&sample_record()).unwrap(), report.prediction);
}

#[test]
fn high_income_sample_scores_above_low_income() {
    let dir = tempdir().unwrap();
    let data = write_csv(dir.path(), "data.csv", &linear_rows(600, 5));
    let report = run_pipeline(&config_in(dir.path()), &data, &sample_record()).unwrap();

    let loaded = load_pipeline(&dir.path().join("out").join("model.zip"), &Schema::housing())
        .unwrap();
    let engine = PredictionEngine::new(loaded.pipeline);
    let poor = HousingRecord {
        median_income: 1.0,
        ..sample_record()
    };
    let poor_value = engine.predict(&poor).unwrap().median_house_value;
    assert!(report.prediction.median_house_value > poor_value);
}

#[test]
fn same_seed_gives_same_report() {
    let dir = tempdir().unwrap();
    let data = write_csv(dir.path(), "data.csv", &linear_rows(300, 8));
    let first = run_pipeline(&config_in(dir.path()), &data, &sample_record()).unwrap();
    let second = run_pipeline(&config_in(dir.path()), &data, &sample_record()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn non_numeric_income_aborts_before_artifact_is_written() {
    let dir = tempdir().unwrap();
    let mut contents = linear_rows(50, 1);
    contents.push_str("-122.23,37.88,41,880,129,322,126,lots,452600,NEAR BAY\n");
    let data = write_csv(dir.path(), "data.csv", &contents);
    let config = config_in(dir.path());

    let err = run_pipeline(&config, &data, &sample_record()).unwrap_err();
    match err {
        PipelineError::DataFormat { row, message, .. } => {
            assert_eq!(row, Some(51));
            assert!(message.contains("medianIncome"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!config.model_path.exists());
}

#[test]
fn header_only_file_cannot_be_split() {
    let dir = tempdir().unwrap();
    let data = write_csv(dir.path(), "data.csv", &format!("{HEADER}\n"));
    let err = run_pipeline(&config_in(dir.path()), &data, &sample_record()).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidSplit(_)));
}

#[test]
fn missing_data_file_is_not_found() {
    let dir = tempdir().unwrap();
    let err = run_pipeline(
        &config_in(dir.path()),
        &dir.path().join("absent.csv"),
        &sample_record(),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound { .. }));
}

#[test]
fn config_home_override_locates_config_file() {
    let base = tempdir().unwrap();
    let _guard = HomevalEnvGuard::set_config_home(base.path().to_path_buf());
    let path = config::config_path().unwrap();
    assert!(path.starts_with(base.path()));

    std::fs::write(&path, "[split]\ntest_fraction = 0.25\n").unwrap();
    let loaded = PipelineConfig::load_or_default().unwrap();
    assert_eq!(loaded.split.test_fraction, 0.25);
    assert_eq!(loaded.search_depth, 4);
}
