//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for pipeline results.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures surfaced by the load/split/fit/train/evaluate/persist/predict stages.
///
/// Every variant is terminal for the current run; nothing in the pipeline
/// retries or skips rows.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file or model artifact does not exist.
    #[error("File or directory does not exist at path: {}", path.display())]
    NotFound {
        /// Path that failed to resolve.
        path: PathBuf,
    },
    /// A required field is missing or unparseable.
    #[error("Invalid data{}: {message}", location_suffix(path.as_ref(), *row))]
    DataFormat {
        /// Source file, when the record came from disk.
        path: Option<PathBuf>,
        /// 1-based data row index (header excluded), when known.
        row: Option<usize>,
        /// Description including the column and raw value.
        message: String,
    },
    /// Train/test partition would be degenerate.
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    /// Fitting or evaluating on zero rows.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),
    /// Insufficient or malformed training data, or invalid training options.
    #[error("Training failed: {0}")]
    Training(String),
    /// Persisted artifact does not match what the caller expects.
    #[error("Corrupt model artifact at {}: {message}", path.display())]
    CorruptArtifact {
        /// Artifact path.
        path: PathBuf,
        /// What was wrong, including expected vs. actual where applicable.
        message: String,
    },
    /// Unexpected filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn data_format(
        path: Option<&std::path::Path>,
        row: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::DataFormat {
            path: path.map(|p| p.to_path_buf()),
            row,
            message: message.into(),
        }
    }

    pub(crate) fn corrupt(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::CorruptArtifact {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn location_suffix(path: Option<&PathBuf>, row: Option<usize>) -> String {
    match (path, row) {
        (Some(path), Some(row)) => format!(" in {} at row {row}", path.display()),
        (Some(path), None) => format!(" in {}", path.display()),
        (None, Some(row)) => format!(" at row {row}"),
        (None, None) => String::new(),
    }
}
