//! CSV loader for housing datasets.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::schema::{HousingRecord, Schema};

use super::Dataset;

/// Load a comma-separated file with a header row into a [`Dataset`].
///
/// Columns map positionally onto `schema`. The first malformed row aborts the
/// load with its 1-based data row index.
pub fn load_dataset(path: &Path, schema: &Schema) -> PipelineResult<Dataset> {
    if !path.is_file() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| csv_error(path, None, err))?;

    let header = reader
        .headers()
        .map_err(|err| csv_error(path, None, err))?
        .clone();
    check_header(path, &header, schema)?;

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row_number = idx + 1;
        let row = row.map_err(|err| csv_error(path, Some(row_number), err))?;
        let cells: Vec<&str> = row.iter().collect();
        records.push(HousingRecord::parse_row(
            schema,
            &cells,
            Some(path),
            Some(row_number),
            true,
        )?);
    }

    info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(Dataset::new(schema.clone(), records))
}

/// Validate the header width and return the columns whose names differ from the schema.
fn check_header(
    path: &Path,
    header: &csv::StringRecord,
    schema: &Schema,
) -> PipelineResult<Vec<usize>> {
    let expected = schema.column_count();
    if header.len() < expected {
        return Err(PipelineError::data_format(
            Some(path),
            None,
            format!(
                "header has {} columns, expected at least {expected}",
                header.len()
            ),
        ));
    }
    let mut renamed = Vec::new();
    for field in &schema.fields {
        let found = header.get(field.column).unwrap_or_default();
        if !same_name(found, &field.name) {
            warn!(
                "Column {} header '{found}' does not match field '{}'; mapping positionally",
                field.column, field.name
            );
            renamed.push(field.column);
        }
    }
    Ok(renamed)
}

/// Compare header names ignoring case and `_`, so `median_income` matches `medianIncome`.
fn same_name(header: &str, field: &str) -> bool {
    let normalize = |s: &str| -> String {
        s.chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect()
    };
    normalize(header) == normalize(field)
}

fn csv_error(path: &Path, row: Option<usize>, err: csv::Error) -> PipelineError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::io(path, source),
        _ => PipelineError::data_format(Some(path), row, message),
    }
}
