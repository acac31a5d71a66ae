//! Train, evaluate and persist the housing value model, then score a sample district.

use std::path::PathBuf;

use homeval::config::{self, PipelineConfig};
use homeval::logging;
use homeval::ml::metrics::format_r_squared;
use homeval::pipeline::{run_pipeline, sample_record};
use homeval::resolve::locate_data_file;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = load_config(options.config.as_ref())?;
    options.apply(&mut config);

    if let Err(err) = logging::init(&config.logging) {
        eprintln!("Logging disabled: {err}");
    }

    let data_path = locate_data_file(&config.data_file, config.search_depth).ok_or_else(|| {
        format!(
            "File or directory does not exist at path: {}",
            config.data_file.display()
        )
    })?;
    let report =
        run_pipeline(&config, &data_path, &sample_record()).map_err(|err| err.to_string())?;

    println!("RMSE: {}", report.metrics.rmse);
    println!("R^2: {}", format_r_squared(report.metrics.r_squared));
    println!(
        "Predicted Median House Value: {:.2}",
        report.prediction.median_house_value
    );
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, String> {
    match path {
        Some(path) => PipelineConfig::load_from(path).map_err(|err| err.to_string()),
        None => match config::config_path() {
            Ok(path) => PipelineConfig::load_from(&path).map_err(|err| err.to_string()),
            Err(err) => {
                eprintln!("Using default configuration: {err}");
                Ok(PipelineConfig::default())
            }
        },
    }
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    data: Option<PathBuf>,
    model: Option<PathBuf>,
    test_fraction: Option<f64>,
    seed: Option<u64>,
}

impl CliOptions {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(data) = &self.data {
            config.data_file = data.clone();
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(fraction) = self.test_fraction {
            config.split.test_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.split.seed = Some(seed);
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                options.data = Some(PathBuf::from(value));
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                options.model = Some(PathBuf::from(value));
            }
            "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-fraction requires a value".to_string())?;
                let fraction = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --test-fraction value: {value}"))?;
                options.test_fraction = Some(fraction);
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                let seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
                options.seed = Some(seed);
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "homeval",
        "",
        "Train a gradient-boosted model of median house value, report held-out",
        "RMSE and R^2, save it as a zip artifact, then reload it and score a",
        "sample district.",
        "",
        "Usage:",
        "  homeval [--config <file>] [--data <csv>] [--model <zip>]",
        "          [--test-fraction <f>] [--seed <n>]",
        "",
        "Defaults come from homeval.toml in the application directory.",
        "Relative --data paths are searched for upward from the executable",
        "and working directories.",
    ]
    .join("\n")
}
