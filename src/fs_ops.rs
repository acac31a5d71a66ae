//! Crash-safe file replacement shared by the artifact and config writers.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const TEMP_CREATE_ATTEMPTS: usize = 5;

/// Write `path` through a sibling temp file that is renamed over it once `write` succeeds.
///
/// On any failure the temp file is removed and an existing `path` keeps its old contents.
pub(crate) fn replace_atomically<E>(
    path: &Path,
    io_error: impl Fn(&Path, io::Error) -> E,
    write: impl FnOnce(&mut File) -> Result<(), E>,
) -> Result<(), E> {
    let (tmp_path, mut file) = create_sibling_temp(path).map_err(|err| io_error(path, err))?;
    let result = write(&mut file).and_then(|()| {
        file.sync_all()
            .map_err(|err| io_error(&tmp_path, err))
    });
    drop(file);
    if let Err(err) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }
    if let Err(err) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_error(path, err));
    }
    Ok(())
}

fn create_sibling_temp(path: &Path) -> io::Result<(PathBuf, File)> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
    })?;

    let mut last_err = None;
    for _ in 0..TEMP_CREATE_ATTEMPTS {
        let suffix: u32 = rand::random();
        let tmp_path = dir.join(format!("{}.tmp-{suffix:08x}", file_name.to_string_lossy()));
        match OpenOptions::new().write(true).create_new(true).open(&tmp_path) {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("no free temporary file name")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.zip");
        std::fs::write(&path, b"previous").unwrap();

        let err = replace_atomically(
            &path,
            |_, err| err,
            |file| {
                file.write_all(b"half")?;
                Err(io::Error::other("disk full"))
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");
        assert_eq!(dir_entries(dir.path()), vec!["model.zip"]);
    }

    #[test]
    fn successful_write_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("homeval.toml");
        std::fs::write(&path, b"old").unwrap();

        replace_atomically(&path, |_, err| err, |file| file.write_all(b"new")).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(dir_entries(dir.path()), vec!["homeval.toml"]);
    }

    #[test]
    fn missing_parent_directory_reports_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("model.zip");
        let err = replace_atomically(&path, |p, err| (p.to_path_buf(), err), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err.0, path);
        assert_eq!(err.1.kind(), io::ErrorKind::NotFound);
    }
}
