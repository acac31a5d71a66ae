//! Train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};

use super::Dataset;

/// Partitioning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Fraction of rows held out for evaluation, in `(0, 1)`.
    pub test_fraction: f64,
    /// Shuffle seed. `None` draws from the thread RNG, so membership changes per run.
    pub seed: Option<u64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: Some(0),
        }
    }
}

/// Disjoint train/test subsets whose union is the source dataset.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Shuffle row indices and hold out `round(n * test_fraction)` of them.
///
/// Both subsets keep the source row order.
pub fn split_dataset(dataset: &Dataset, options: &SplitOptions) -> PipelineResult<Split> {
    let fraction = options.test_fraction;
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(PipelineError::InvalidSplit(format!(
            "test fraction {fraction} must lie strictly between 0 and 1"
        )));
    }
    let n = dataset.len();
    let test_n = ((n as f64) * fraction).round() as usize;
    if test_n == 0 || test_n >= n {
        return Err(PipelineError::InvalidSplit(format!(
            "{n} rows with test fraction {fraction} leaves {test_n} test and {} train rows",
            n.saturating_sub(test_n)
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    match options.seed {
        Some(seed) => order.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => order.shuffle(&mut rand::rng()),
    }
    let (test_idx, train_idx) = order.split_at_mut(test_n);
    test_idx.sort_unstable();
    train_idx.sort_unstable();

    let split = Split {
        train: dataset.select(train_idx),
        test: dataset.select(test_idx),
    };
    info!(
        "Split {n} rows into {} train / {} test (seed {:?})",
        split.train.len(),
        split.test.len(),
        options.seed
    );
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{HousingRecord, PREDICTOR_COUNT, Schema};
    use std::collections::BTreeSet;

    fn dataset(n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| HousingRecord::from_predictors([i as f32; PREDICTOR_COUNT], Some(i as f32)))
            .collect();
        Dataset::new(Schema::housing(), records)
    }

    fn ids(dataset: &Dataset) -> BTreeSet<u32> {
        dataset
            .records()
            .iter()
            .map(|record| record.longitude as u32)
            .collect()
    }

    #[test]
    fn split_is_disjoint_and_complete() {
        let source = dataset(50);
        let split = split_dataset(&source, &SplitOptions::default()).unwrap();
        let train = ids(&split.train);
        let test = ids(&split.test);
        assert!(train.is_disjoint(&test));
        let union: BTreeSet<u32> = train.union(&test).copied().collect();
        assert_eq!(union, ids(&source));
        assert_eq!(split.test.len(), 10);
        assert_eq!(split.train.len(), 40);
    }

    #[test]
    fn same_seed_gives_same_partition() {
        let source = dataset(100);
        let options = SplitOptions {
            test_fraction: 0.3,
            seed: Some(42),
        };
        let a = split_dataset(&source, &options).unwrap();
        let b = split_dataset(&source, &options).unwrap();
        assert_eq!(ids(&a.test), ids(&b.test));
    }

    #[test]
    fn subsets_preserve_source_order() {
        let split = split_dataset(&dataset(30), &SplitOptions::default()).unwrap();
        let values: Vec<f32> = split.train.records().iter().map(|r| r.latitude).collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn unseeded_split_still_partitions() {
        let source = dataset(20);
        let options = SplitOptions {
            test_fraction: 0.25,
            seed: None,
        };
        let split = split_dataset(&source, &options).unwrap();
        assert_eq!(split.test.len(), 5);
        assert!(ids(&split.train).is_disjoint(&ids(&split.test)));
    }

    #[test]
    fn rejects_fraction_out_of_range() {
        for fraction in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let options = SplitOptions {
                test_fraction: fraction,
                seed: Some(1),
            };
            let err = split_dataset(&dataset(10), &options).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidSplit(_)));
        }
    }

    #[test]
    fn rejects_dataset_too_small_for_fraction() {
        let err = split_dataset(&dataset(2), &SplitOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSplit(_)));
        let options = SplitOptions {
            test_fraction: 0.9,
            seed: Some(1),
        };
        let err = split_dataset(&dataset(3), &options).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSplit(_)));
    }
}
