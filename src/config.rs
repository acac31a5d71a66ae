//! Run configuration loaded from `homeval.toml`.
//!
//! Every stage receives its section by value; there is no process-wide context.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{AppDirError, AppDirs};
use crate::dataset::SplitOptions;
use crate::fs_ops::replace_atomically;
use crate::logging::LogSettings;
use crate::ml::gbdt::TrainOptions;
use crate::model_store::DEFAULT_MODEL_FILE_NAME;

/// Config file name inside the application directory.
pub const CONFIG_FILE_NAME: &str = "homeval.toml";

/// Errors that may occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No application directory could be resolved.
    #[error("Unable to resolve config directory: {0}")]
    AppDir(#[from] AppDirError),
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML serialization error.
        source: toml::ser::Error,
    },
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input CSV; relative names are searched for upward from the executable and working directory.
    pub data_file: PathBuf,
    /// Where the trained artifact is written and read back from.
    pub model_path: PathBuf,
    /// How many directory levels (starting directory included) to search for `data_file`.
    pub search_depth: usize,
    pub split: SplitOptions,
    pub train: TrainOptions,
    pub logging: LogSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data.csv"),
            model_path: PathBuf::from(DEFAULT_MODEL_FILE_NAME),
            search_depth: 4,
            split: SplitOptions::default(),
            train: TrainOptions::default(),
            logging: LogSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from `path`, returning defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `homeval.toml` from the application directory.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()?)
    }

    /// Write the TOML file atomically, replacing any previous contents.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self).map_err(|source| ConfigError::SerializeToml {
            path: path.to_path_buf(),
            source,
        })?;
        let write_error = |path: &Path, source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        replace_atomically(path, write_error, |file| {
            file.write_all(text.as_bytes())
                .map_err(|source| write_error(path, source))
        })
    }
}

/// Resolve the configuration file path inside the application directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(AppDirs::resolve()?.file(CONFIG_FILE_NAME)?)
}
