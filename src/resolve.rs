//! Locate input files relative to the executable or working directory.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Search `start_dir` and its ancestors for `file_name`.
///
/// `max_levels` counts directories checked, `start_dir` included.
pub fn resolve_data_path(file_name: &Path, start_dir: &Path, max_levels: usize) -> Option<PathBuf> {
    let mut dir = Some(start_dir);
    for _ in 0..max_levels {
        let current = dir?;
        let candidate = current.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

/// Locate a data file the way the command-line tool does.
///
/// Absolute paths and paths that already exist are returned as-is. Otherwise
/// the executable directory is searched first, then the working directory,
/// each up to `max_levels` deep.
pub fn locate_data_file(file_name: &Path, max_levels: usize) -> Option<PathBuf> {
    if file_name.is_absolute() || file_name.is_file() {
        return file_name.is_file().then(|| file_name.to_path_buf());
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();
    for start in [exe_dir, cwd].into_iter().flatten() {
        debug!("Searching for {} from {}", file_name.display(), start.display());
        if let Some(found) = resolve_data_path(file_name, &start, max_levels) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_file_in_ancestor_within_depth() {
        let root = tempdir().unwrap();
        let deep = root.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(root.path().join("a").join("data.csv"), "x").unwrap();

        let found = resolve_data_path(Path::new("data.csv"), &deep, 3).unwrap();
        assert_eq!(found, root.path().join("a").join("data.csv"));
    }

    #[test]
    fn stops_after_max_levels() {
        let root = tempdir().unwrap();
        let deep = root.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(root.path().join("data.csv"), "x").unwrap();

        assert!(resolve_data_path(Path::new("data.csv"), &deep, 3).is_none());
        assert!(resolve_data_path(Path::new("data.csv"), &deep, 4).is_some());
    }

    #[test]
    fn absolute_path_is_checked_directly() {
        let root = tempdir().unwrap();
        let path = root.path().join("data.csv");
        assert!(locate_data_file(&path, 4).is_none());
        std::fs::write(&path, "x").unwrap();
        assert_eq!(locate_data_file(&path, 4), Some(path));
    }
}
