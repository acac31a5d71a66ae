//! Versioned zip artifact holding the schema, normalization statistics and trees.
//!
//! Layout:
//! - `manifest.json`: format version, schema, SHA-256 of the other entries, optional metrics.
//! - `features.json`: [`FittedFeaturePipeline`].
//! - `model.json`: [`GbdtRegressor`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::fs_ops::replace_atomically;
use crate::ml::gbdt::GbdtRegressor;
use crate::ml::{FittedFeaturePipeline, RegressionMetrics, TrainedPipeline};
use crate::schema::Schema;

/// Artifact layout version written by [`save_pipeline`].
pub const ARTIFACT_FORMAT_VERSION: i64 = 1;
/// Default artifact file name.
pub const DEFAULT_MODEL_FILE_NAME: &str = "model.zip";

const MANIFEST_ENTRY: &str = "manifest.json";
const FEATURES_ENTRY: &str = "features.json";
const MODEL_ENTRY: &str = "model.json";
const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Parsed `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: i64,
    pub schema: Schema,
    /// RFC 3339 timestamp of when the artifact was written.
    pub created_at: String,
    /// Entry name to lowercase hex SHA-256.
    pub checksums: BTreeMap<String, String>,
    /// Held-out metrics recorded at training time.
    #[serde(default)]
    pub metrics: Option<RegressionMetrics>,
}

/// Pipeline reconstructed from disk plus its manifest.
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub pipeline: TrainedPipeline,
    pub manifest: ArtifactManifest,
}

/// Write `pipeline` to a single zip artifact at `path`, creating parent directories.
///
/// The archive is assembled in a sibling temp file, so a failed save leaves any
/// previous artifact at `path` intact.
pub fn save_pipeline(
    pipeline: &TrainedPipeline,
    metrics: Option<&RegressionMetrics>,
    path: &Path,
) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::io(parent, source))?;
    }
    let features_bytes = to_json(path, pipeline.features())?;
    let model_bytes = to_json(path, pipeline.model())?;
    let manifest = ArtifactManifest {
        format_version: ARTIFACT_FORMAT_VERSION,
        schema: pipeline.schema().clone(),
        created_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        checksums: BTreeMap::from([
            (FEATURES_ENTRY.to_string(), sha256_hex(&features_bytes)),
            (MODEL_ENTRY.to_string(), sha256_hex(&model_bytes)),
        ]),
        metrics: metrics.copied(),
    };
    let manifest_bytes = to_json(path, &manifest)?;

    let entries = [
        (MANIFEST_ENTRY, manifest_bytes.as_slice()),
        (FEATURES_ENTRY, features_bytes.as_slice()),
        (MODEL_ENTRY, model_bytes.as_slice()),
    ];
    replace_atomically(path, PipelineError::io, |file| {
        write_entries(file, path, &entries)
    })?;
    info!(
        "Saved model artifact ({} trees) to {}",
        pipeline.model().trees.len(),
        path.display()
    );
    Ok(())
}

/// Reconstruct a pipeline saved by [`save_pipeline`].
///
/// The embedded schema must equal `expected`; entries must match their checksums.
pub fn load_pipeline(path: &Path, expected: &Schema) -> PipelineResult<LoadedArtifact> {
    if !path.exists() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| PipelineError::io(path, source))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|err| PipelineError::corrupt(path, format!("not a model archive: {err}")))?;

    let manifest_bytes = read_entry(path, &mut archive, MANIFEST_ENTRY)?;
    let manifest: ArtifactManifest = from_json(path, MANIFEST_ENTRY, &manifest_bytes)?;
    if manifest.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(PipelineError::corrupt(
            path,
            format!(
                "unsupported format_version {} (expected {ARTIFACT_FORMAT_VERSION})",
                manifest.format_version
            ),
        ));
    }
    if let Some(message) = expected.mismatch(&manifest.schema) {
        return Err(PipelineError::corrupt(path, message));
    }

    let features_bytes = read_verified_entry(path, &mut archive, &manifest, FEATURES_ENTRY)?;
    let features: FittedFeaturePipeline = from_json(path, FEATURES_ENTRY, &features_bytes)?;
    features
        .validate()
        .map_err(|err| PipelineError::corrupt(path, format!("{FEATURES_ENTRY}: {err}")))?;
    if let Some(message) = expected.mismatch(features.schema()) {
        return Err(PipelineError::corrupt(path, format!("{FEATURES_ENTRY}: {message}")));
    }

    let model_bytes = read_verified_entry(path, &mut archive, &manifest, MODEL_ENTRY)?;
    let model: GbdtRegressor = from_json(path, MODEL_ENTRY, &model_bytes)?;
    model
        .validate()
        .map_err(|err| PipelineError::corrupt(path, format!("{MODEL_ENTRY}: {err}")))?;

    let pipeline = TrainedPipeline::from_parts(features, model)
        .map_err(|err| PipelineError::corrupt(path, err))?;
    info!(
        "Loaded model artifact from {} (written {})",
        path.display(),
        manifest.created_at
    );
    Ok(LoadedArtifact { pipeline, manifest })
}

fn write_entries(file: &mut File, path: &Path, entries: &[(&str, &[u8])]) -> PipelineResult<()> {
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(*name, options)
            .map_err(|err| write_error(path, err))?;
        zip.write_all(bytes)
            .map_err(|source| PipelineError::io(path, source))?;
    }
    zip.finish().map_err(|err| write_error(path, err))?;
    Ok(())
}

fn read_entry(
    path: &Path,
    archive: &mut zip::ZipArchive<File>,
    name: &str,
) -> PipelineResult<Vec<u8>> {
    let entry = archive.by_name(name).map_err(|err| match err {
        zip::result::ZipError::FileNotFound => {
            PipelineError::corrupt(path, format!("missing entry {name}"))
        }
        other => PipelineError::corrupt(path, format!("unreadable entry {name}: {other}")),
    })?;
    if entry.size() > MAX_ENTRY_BYTES {
        return Err(PipelineError::corrupt(
            path,
            format!("entry {name} is too large ({} bytes)", entry.size()),
        ));
    }
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|err| PipelineError::corrupt(path, format!("unreadable entry {name}: {err}")))?;
    Ok(bytes)
}

fn read_verified_entry(
    path: &Path,
    archive: &mut zip::ZipArchive<File>,
    manifest: &ArtifactManifest,
    name: &str,
) -> PipelineResult<Vec<u8>> {
    let bytes = read_entry(path, archive, name)?;
    let Some(expected) = manifest.checksums.get(name) else {
        return Err(PipelineError::corrupt(
            path,
            format!("manifest has no checksum for {name}"),
        ));
    };
    let actual = sha256_hex(&bytes);
    if &actual != expected {
        return Err(PipelineError::corrupt(
            path,
            format!("checksum mismatch for {name}: expected {expected}, found {actual}"),
        ));
    }
    Ok(bytes)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn to_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .map_err(|err| PipelineError::io(path, std::io::Error::other(err)))
}

fn from_json<T: for<'de> Deserialize<'de>>(
    path: &Path,
    name: &str,
    bytes: &[u8],
) -> PipelineResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|err| PipelineError::corrupt(path, format!("invalid {name}: {err}")))
}

fn write_error(path: &Path, err: zip::result::ZipError) -> PipelineError {
    match err {
        zip::result::ZipError::Io(source) => PipelineError::io(path, source),
        other => PipelineError::io(path, std::io::Error::other(other)),
    }
}
