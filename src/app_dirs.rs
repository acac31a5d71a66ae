//! Where `homeval` keeps its config file and logs.
//!
//! Everything lives in one `.homeval` folder under the OS config directory, or
//! under `HOMEVAL_CONFIG_HOME` when that is set.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application folder created under the base directory.
pub const APP_DIR_NAME: &str = ".homeval";

/// Environment variable that relocates the base directory.
pub const CONFIG_HOME_ENV: &str = "HOMEVAL_CONFIG_HOME";

const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    /// Neither `HOMEVAL_CONFIG_HOME` nor an OS config directory is available.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved `.homeval` folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Resolve from `HOMEVAL_CONFIG_HOME` or the OS config directory.
    pub fn resolve() -> Result<Self, AppDirError> {
        let base = std::env::var_os(CONFIG_HOME_ENV)
            .map(PathBuf::from)
            .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
            .ok_or(AppDirError::NoBaseDir)?;
        Ok(Self::under(&base))
    }

    /// Place the application folder under an explicit base directory.
    pub fn under(base: &Path) -> Self {
        Self {
            root: base.join(APP_DIR_NAME),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name` directly inside the application folder, which is created if missing.
    pub fn file(&self, name: &str) -> Result<PathBuf, AppDirError> {
        ensure_dir(&self.root)?;
        Ok(self.root.join(name))
    }

    /// The `logs` folder, created if missing.
    pub fn logs_dir(&self) -> Result<PathBuf, AppDirError> {
        let path = self.root.join(LOGS_DIR_NAME);
        ensure_dir(&path)?;
        Ok(path)
    }
}

fn ensure_dir(path: &Path) -> Result<(), AppDirError> {
    std::fs::create_dir_all(path).map_err(|source| AppDirError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
