use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

use super::model::{GBDT_MODEL_VERSION, GbdtRegressor, RegressionTree, TreeNode};

/// Training hyperparameters for tree boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Number of boosting rounds (one tree per round).
    pub num_trees: usize,
    /// Maximum leaves per tree; trees grow leaf-wise up to this count.
    pub num_leaves: usize,
    /// Smallest number of rows a leaf may hold.
    pub min_examples_per_leaf: usize,
    /// Learning rate applied per tree.
    pub learning_rate: f32,
    /// Number of bins used for split search.
    pub bins: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            num_trees: 100,
            num_leaves: 20,
            min_examples_per_leaf: 10,
            learning_rate: 0.2,
            bins: 255,
        }
    }
}

impl TrainOptions {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.num_trees == 0 {
            return Err(PipelineError::Training("num_trees must be positive".into()));
        }
        if self.num_leaves < 2 {
            return Err(PipelineError::Training("num_leaves must be at least 2".into()));
        }
        if self.min_examples_per_leaf == 0 {
            return Err(PipelineError::Training(
                "min_examples_per_leaf must be positive".into(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::Training(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(2..=256).contains(&self.bins) {
            return Err(PipelineError::Training(format!(
                "bins must lie in 2..=256, got {}",
                self.bins
            )));
        }
        Ok(())
    }
}

/// In-memory regression dataset used for training.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Number of `f32` values in each feature vector.
    pub feature_len: usize,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Targets aligned with `x`.
    pub y: Vec<f32>,
}

/// Minimum number of rows needed to fit a model.
pub const MIN_TRAINING_ROWS: usize = 2;

/// Fit a squared-error gradient-boosted tree ensemble.
///
/// Deterministic: the same rows in the same order always produce the same model.
pub fn train_gbdt(dataset: &TrainDataset, options: &TrainOptions) -> PipelineResult<GbdtRegressor> {
    options.validate()?;
    check_dataset(dataset)?;

    let n = dataset.x.len();
    let d = dataset.feature_len;
    let (mins, maxs) = compute_feature_min_max(&dataset.x, d);
    let binned = bin_features(&dataset.x, &mins, &maxs, options.bins);

    let base_score = (dataset.y.iter().map(|&v| v as f64).sum::<f64>() / n as f64) as f32;
    let mut scores = vec![base_score; n];
    let mut residuals = vec![0.0f32; n];
    let mut trees = Vec::with_capacity(options.num_trees);

    for round in 0..options.num_trees {
        for i in 0..n {
            residuals[i] = dataset.y[i] - scores[i];
        }
        let tree = grow_tree(&binned, &dataset.x, &residuals, options);
        for (score, row) in scores.iter_mut().zip(&dataset.x) {
            *score += options.learning_rate * tree.predict(row);
        }
        trees.push(tree);
        if (round + 1) % 10 == 0 {
            debug!(
                "Boosting round {}/{}: train rmse {:.4}",
                round + 1,
                options.num_trees,
                rmse(&dataset.y, &scores)
            );
        }
    }

    Ok(GbdtRegressor {
        model_version: GBDT_MODEL_VERSION,
        feature_len: d,
        learning_rate: options.learning_rate,
        base_score,
        trees,
    })
}

fn check_dataset(dataset: &TrainDataset) -> PipelineResult<()> {
    if dataset.x.len() != dataset.y.len() {
        return Err(PipelineError::Training(format!(
            "Mismatched X/Y lengths: {} rows, {} targets",
            dataset.x.len(),
            dataset.y.len()
        )));
    }
    if dataset.x.len() < MIN_TRAINING_ROWS {
        return Err(PipelineError::Training(format!(
            "Need at least {MIN_TRAINING_ROWS} rows, got {}",
            dataset.x.len()
        )));
    }
    if dataset.feature_len == 0 || dataset.feature_len > u16::MAX as usize {
        return Err(PipelineError::Training(format!(
            "Unsupported feature length {}",
            dataset.feature_len
        )));
    }
    for (idx, row) in dataset.x.iter().enumerate() {
        if row.len() != dataset.feature_len {
            return Err(PipelineError::Training(format!(
                "Row {idx} has {} features, expected {}",
                row.len(),
                dataset.feature_len
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Training(format!(
                "Row {idx} has a non-finite feature"
            )));
        }
    }
    if let Some(idx) = dataset.y.iter().position(|v| !v.is_finite()) {
        return Err(PipelineError::Training(format!(
            "Target {idx} is not finite"
        )));
    }
    Ok(())
}

fn rmse(y: &[f32], scores: &[f32]) -> f64 {
    let sse: f64 = y
        .iter()
        .zip(scores)
        .map(|(&a, &p)| {
            let e = (p - a) as f64;
            e * e
        })
        .sum();
    (sse / y.len().max(1) as f64).sqrt()
}

fn compute_feature_min_max(x: &[Vec<f32>], feature_len: usize) -> (Vec<f32>, Vec<f32>) {
    let mut mins = vec![f32::INFINITY; feature_len];
    let mut maxs = vec![f32::NEG_INFINITY; feature_len];
    for row in x {
        for (j, &v) in row.iter().take(feature_len).enumerate() {
            mins[j] = mins[j].min(v);
            maxs[j] = maxs[j].max(v);
        }
    }
    (mins, maxs)
}

/// Floor-bin each value into `0..bins`; monotone in the raw value.
fn bin_features(x: &[Vec<f32>], mins: &[f32], maxs: &[f32], bins: usize) -> Vec<Vec<u8>> {
    let top = (bins - 1) as f32;
    x.iter()
        .map(|row| {
            mins.iter()
                .zip(maxs)
                .zip(row)
                .map(|((&min, &max), &v)| {
                    if max > min {
                        let t = ((v - min) / (max - min)).clamp(0.0, 1.0);
                        (t * bins as f32).floor().min(top) as u8
                    } else {
                        0
                    }
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    gain: f64,
    feature_index: usize,
    split_bin: u8,
    threshold: f32,
}

struct GrowingLeaf {
    node: usize,
    rows: Vec<usize>,
    split: Option<SplitCandidate>,
}

/// Grow one tree leaf-wise: repeatedly split the leaf with the largest gain.
fn grow_tree(
    binned: &[Vec<u8>],
    x: &[Vec<f32>],
    residuals: &[f32],
    options: &TrainOptions,
) -> RegressionTree {
    let all_rows: Vec<usize> = (0..x.len()).collect();
    let mut nodes = vec![TreeNode::Leaf {
        value: mean_residual(&all_rows, residuals),
    }];
    let root_split = best_split(binned, x, residuals, &all_rows, options);
    let mut leaves = vec![GrowingLeaf {
        node: 0,
        rows: all_rows,
        split: root_split,
    }];

    while leaves.len() < options.num_leaves {
        let mut chosen: Option<(usize, SplitCandidate)> = None;
        for (idx, leaf) in leaves.iter().enumerate() {
            if let Some(split) = leaf.split
                && chosen.is_none_or(|(_, best)| split.gain > best.gain)
            {
                chosen = Some((idx, split));
            }
        }
        let Some((leaf_idx, split)) = chosen else {
            break;
        };
        let leaf = leaves.swap_remove(leaf_idx);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
            .rows
            .iter()
            .partition(|&&row| binned[row][split.feature_index] <= split.split_bin);

        let left = nodes.len();
        let right = left + 1;
        nodes.push(TreeNode::Leaf {
            value: mean_residual(&left_rows, residuals),
        });
        nodes.push(TreeNode::Leaf {
            value: mean_residual(&right_rows, residuals),
        });
        nodes[leaf.node] = TreeNode::Split {
            feature_index: split.feature_index as u16,
            threshold: split.threshold,
            left: left as u32,
            right: right as u32,
        };

        for (node, rows) in [(left, left_rows), (right, right_rows)] {
            let split = best_split(binned, x, residuals, &rows, options);
            leaves.push(GrowingLeaf { node, rows, split });
        }
    }

    RegressionTree { nodes }
}

fn mean_residual(rows: &[usize], residuals: &[f32]) -> f32 {
    if rows.is_empty() {
        return 0.0;
    }
    let sum: f64 = rows.iter().map(|&row| residuals[row] as f64).sum();
    (sum / rows.len() as f64) as f32
}

#[derive(Clone, Copy)]
struct BinStats {
    count: usize,
    sum: f64,
    min_value: f32,
    max_value: f32,
}

impl Default for BinStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min_value: f32::INFINITY,
            max_value: f32::NEG_INFINITY,
        }
    }
}

/// Best variance-reducing split over all features for `rows`, if any.
fn best_split(
    binned: &[Vec<u8>],
    x: &[Vec<f32>],
    residuals: &[f32],
    rows: &[usize],
    options: &TrainOptions,
) -> Option<SplitCandidate> {
    let min_leaf = options.min_examples_per_leaf;
    if rows.len() < 2 * min_leaf {
        return None;
    }
    let n_features = x.first().map(Vec::len).unwrap_or(0);
    let mut best: Option<SplitCandidate> = None;
    for feature_idx in 0..n_features {
        if let Some(candidate) =
            best_split_for_feature(binned, x, residuals, rows, feature_idx, options.bins, min_leaf)
            && best.is_none_or(|b| candidate.gain > b.gain)
        {
            best = Some(candidate);
        }
    }
    best
}

fn best_split_for_feature(
    binned: &[Vec<u8>],
    x: &[Vec<f32>],
    residuals: &[f32],
    rows: &[usize],
    feature_idx: usize,
    bins: usize,
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let mut hist = vec![BinStats::default(); bins];
    for &row in rows {
        let stats = &mut hist[binned[row][feature_idx] as usize];
        let value = x[row][feature_idx];
        stats.count += 1;
        stats.sum += residuals[row] as f64;
        stats.min_value = stats.min_value.min(value);
        stats.max_value = stats.max_value.max(value);
    }

    let total_count = rows.len();
    let total_sum: f64 = hist.iter().map(|b| b.sum).sum();
    let parent_score = total_sum * total_sum / total_count as f64;

    // suffix_min[b] = smallest raw value in bins b.. (the right side of a cut after b - 1).
    let mut suffix_min = vec![f32::INFINITY; bins + 1];
    for b in (0..bins).rev() {
        suffix_min[b] = suffix_min[b + 1].min(hist[b].min_value);
    }

    let mut best: Option<SplitCandidate> = None;
    let mut left_count = 0usize;
    let mut left_sum = 0f64;
    let mut left_max = f32::NEG_INFINITY;
    for split_bin in 0..(bins - 1) {
        let stats = hist[split_bin];
        if stats.count == 0 {
            continue;
        }
        left_count += stats.count;
        left_sum += stats.sum;
        left_max = left_max.max(stats.max_value);
        let right_count = total_count - left_count;
        if left_count < min_leaf {
            continue;
        }
        if right_count < min_leaf {
            break;
        }
        let right_sum = total_sum - left_sum;
        let gain = left_sum * left_sum / left_count as f64
            + right_sum * right_sum / right_count as f64
            - parent_score;
        if gain <= 1e-12 || best.is_some_and(|b| gain <= b.gain) {
            continue;
        }
        let right_min = suffix_min[split_bin + 1];
        best = Some(SplitCandidate {
            gain,
            feature_index: feature_idx,
            split_bin: split_bin as u8,
            threshold: threshold_between(left_max, right_min),
        });
    }
    best
}

/// Threshold `t` with `left_max <= t < right_min`.
fn threshold_between(left_max: f32, right_min: f32) -> f32 {
    let mid = left_max + (right_min - left_max) / 2.0;
    if mid < right_min { mid } else { left_max }
}
