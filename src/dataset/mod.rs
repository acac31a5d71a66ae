//! In-memory housing datasets: loading and train/test partitioning.

pub mod loader;
pub mod split;

pub use loader::load_dataset;
pub use split::{Split, SplitOptions, split_dataset};

use crate::schema::{HousingRecord, Schema};

/// Ordered, immutable sequence of records sharing one schema.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    records: Vec<HousingRecord>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<HousingRecord>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[HousingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Targets aligned with `records()`; `None` where a row has no target.
    pub fn targets(&self) -> impl Iterator<Item = Option<f32>> + '_ {
        self.records.iter().map(|record| record.median_house_value)
    }

    /// Copy the rows at `indices`, keeping their order.
    fn select(&self, indices: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            records: indices
                .iter()
                .filter_map(|&idx| self.records.get(idx).cloned())
                .collect(),
        }
    }
}
