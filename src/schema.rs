//! Typed housing record and the explicit schema descriptor that maps it to columns.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Number of numeric predictors fed to the feature pipeline.
pub const PREDICTOR_COUNT: usize = 8;

/// Value type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Real,
    Text,
}

/// How the pipeline consumes a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Numeric predictor, part of the feature vector.
    Feature,
    /// Regression target.
    Label,
    /// Loaded and carried on the record but not used for training.
    Ignored,
}

/// One column of the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Column name as written in the source header.
    pub name: String,
    /// How the cell text is parsed.
    pub kind: FieldKind,
    /// Zero-based position in each row.
    pub column: usize,
    /// What the pipeline does with the parsed value.
    pub role: FieldRole,
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}:{:?}/{:?}",
            self.name, self.column, self.kind, self.role
        )
    }
}

/// Name of the free-text proximity category column.
pub const OCEAN_PROXIMITY: &str = "oceanProximity";

/// Ordered list of fields shared by the loader and the model store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// The ten-column California housing layout.
    pub fn housing() -> Self {
        const LAYOUT: [(&str, FieldKind, FieldRole); 10] = [
            ("longitude", FieldKind::Real, FieldRole::Feature),
            ("latitude", FieldKind::Real, FieldRole::Feature),
            ("housingMedianAge", FieldKind::Real, FieldRole::Feature),
            ("totalRooms", FieldKind::Real, FieldRole::Feature),
            ("totalBedrooms", FieldKind::Real, FieldRole::Feature),
            ("population", FieldKind::Real, FieldRole::Feature),
            ("households", FieldKind::Real, FieldRole::Feature),
            ("medianIncome", FieldKind::Real, FieldRole::Feature),
            ("medianHouseValue", FieldKind::Real, FieldRole::Label),
            (OCEAN_PROXIMITY, FieldKind::Text, FieldRole::Ignored),
        ];
        Self {
            fields: LAYOUT
                .iter()
                .enumerate()
                .map(|(column, (name, kind, role))| FieldDescriptor {
                    name: (*name).to_string(),
                    kind: *kind,
                    column,
                    role: *role,
                })
                .collect(),
        }
    }

    /// Number of columns a row must provide.
    pub fn column_count(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.column + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn features(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|field| field.role == FieldRole::Feature)
    }

    pub fn label(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.role == FieldRole::Label)
    }

    /// Look up a field by its exact name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Describe how `other` differs from `self`, or `None` when identical.
    pub fn mismatch(&self, other: &Schema) -> Option<String> {
        if self == other {
            return None;
        }
        let expected: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
        let actual: Vec<String> = other.fields.iter().map(ToString::to_string).collect();
        Some(format!(
            "schema mismatch: expected [{}], found [{}]",
            expected.join(", "),
            actual.join(", ")
        ))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::housing()
    }
}

/// One housing observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingRecord {
    /// Degrees west are negative.
    pub longitude: f32,
    /// Degrees north.
    pub latitude: f32,
    /// Median building age in the district, in years.
    pub housing_median_age: f32,
    /// Total rooms across all households in the district.
    pub total_rooms: f32,
    /// Total bedrooms across all households in the district.
    pub total_bedrooms: f32,
    /// Residents in the district.
    pub population: f32,
    /// Households in the district.
    pub households: f32,
    /// Median household income, in tens of thousands of dollars.
    pub median_income: f32,
    /// Regression target; absent for inference-only inputs.
    pub median_house_value: Option<f32>,
    /// Proximity category such as `NEAR BAY`; empty when the schema has no such column.
    pub ocean_proximity: String,
}

impl HousingRecord {
    /// Predictors in schema order.
    pub fn predictors(&self) -> [f32; PREDICTOR_COUNT] {
        [
            self.longitude,
            self.latitude,
            self.housing_median_age,
            self.total_rooms,
            self.total_bedrooms,
            self.population,
            self.households,
            self.median_income,
        ]
    }

    /// Build a record from predictor values in schema order.
    pub fn from_predictors(values: [f32; PREDICTOR_COUNT], target: Option<f32>) -> Self {
        let [
            longitude,
            latitude,
            housing_median_age,
            total_rooms,
            total_bedrooms,
            population,
            households,
            median_income,
        ] = values;
        Self {
            longitude,
            latitude,
            housing_median_age,
            total_rooms,
            total_bedrooms,
            population,
            households,
            median_income,
            median_house_value: target,
            ocean_proximity: String::new(),
        }
    }

    /// Parse a delimited row positionally against `schema`.
    ///
    /// `row` is the 1-based data row index used in error messages. When
    /// `require_label` is false an empty or absent target column yields `None`.
    pub fn parse_row(
        schema: &Schema,
        cells: &[&str],
        source: Option<&Path>,
        row: Option<usize>,
        require_label: bool,
    ) -> PipelineResult<Self> {
        let mut predictors = [0.0f32; PREDICTOR_COUNT];
        let mut seen = 0usize;
        for (slot, field) in predictors.iter_mut().zip(schema.features()) {
            *slot = parse_real(field, cells.get(field.column).copied(), source, row)?;
            seen += 1;
        }
        if seen != PREDICTOR_COUNT {
            return Err(PipelineError::data_format(
                source,
                row,
                format!("schema declares {seen} predictors, expected {PREDICTOR_COUNT}"),
            ));
        }

        let target = match schema.label() {
            Some(field) => {
                let raw = cells
                    .get(field.column)
                    .map(|cell| cell.trim())
                    .filter(|cell| !cell.is_empty());
                match (raw, require_label) {
                    (None, false) => None,
                    (raw, _) => Some(parse_real(field, raw, source, row)?),
                }
            }
            None if require_label => {
                return Err(PipelineError::data_format(
                    source,
                    row,
                    "schema has no label column",
                ));
            }
            None => None,
        };

        let ocean_proximity = schema
            .field(OCEAN_PROXIMITY)
            .and_then(|field| cells.get(field.column))
            .map(|cell| cell.trim().to_string())
            .unwrap_or_default();

        let mut record = Self::from_predictors(predictors, target);
        record.ocean_proximity = ocean_proximity;
        Ok(record)
    }

    /// Reject predictors that are not finite numbers.
    pub fn check_predictors(&self, schema: &Schema) -> PipelineResult<()> {
        for (value, field) in self.predictors().iter().zip(schema.features()) {
            if !value.is_finite() {
                return Err(PipelineError::data_format(
                    None,
                    None,
                    format!("column {}: value {value} is missing or not finite", field.name),
                ));
            }
        }
        Ok(())
    }
}

/// Model output for one record, in the unit of `medianHouseValue`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HousingPrediction {
    pub median_house_value: f32,
}

fn parse_real(
    field: &FieldDescriptor,
    raw: Option<&str>,
    source: Option<&Path>,
    row: Option<usize>,
) -> PipelineResult<f32> {
    let Some(raw) = raw.map(str::trim).filter(|cell| !cell.is_empty()) else {
        return Err(PipelineError::data_format(
            source,
            row,
            format!("column {} (#{}) is missing", field.name, field.column),
        ));
    };
    match raw.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PipelineError::data_format(
            source,
            row,
            format!("column {}: cannot parse '{raw}' as a number", field.name),
        )),
    }
}
