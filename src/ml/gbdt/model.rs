use serde::{Deserialize, Serialize};

/// Current serialized model format.
pub const GBDT_MODEL_VERSION: i64 = 1;

/// One node of a regression tree, addressed by index into [`RegressionTree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Route `feature <= threshold` to `left`, everything else to `right`.
    Split {
        feature_index: u16,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Residual correction emitted by the tree.
    Leaf { value: f32 },
}

/// Binary regression tree; node `0` is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Tree with a single leaf.
    pub fn constant(value: f32) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    /// Walk from the root to a leaf and return its value.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let mut idx = 0usize;
        // Bounded by node count so a malformed cycle cannot spin forever.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature_index as usize)
                        .copied()
                        .unwrap_or(0.0);
                    let next = if value <= *threshold { *left } else { *right };
                    idx = next as usize;
                }
                None => return 0.0,
            }
        }
        0.0
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    fn validate(&self, feature_len: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("node {idx} has non-finite leaf value"));
                    }
                }
                TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature_index as usize >= feature_len {
                        return Err(format!(
                            "node {idx} splits on feature {feature_index} but vectors have {feature_len}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has non-finite threshold"));
                    }
                    // Children always follow their parent, which rules out cycles.
                    for child in [*left, *right] {
                        let child = child as usize;
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child index {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Gradient-boosted regression tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtRegressor {
    /// Model format version.
    pub model_version: i64,
    /// Number of `f32` values per feature vector.
    pub feature_len: usize,
    /// Shrinkage applied to every tree output.
    pub learning_rate: f32,
    /// Prediction before any tree is applied (training target mean).
    pub base_score: f32,
    pub trees: Vec<RegressionTree>,
}

impl GbdtRegressor {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != GBDT_MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {GBDT_MODEL_VERSION})",
                self.model_version
            ));
        }
        if self.feature_len == 0 {
            return Err("feature_len must be positive".to_string());
        }
        if !self.learning_rate.is_finite() || !self.base_score.is_finite() {
            return Err("learning_rate and base_score must be finite".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_len)
                .map_err(|err| format!("tree {tree_idx}: {err}"))?;
        }
        Ok(())
    }

    /// Score one feature vector.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let boost: f32 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        self.base_score + self.learning_rate * boost
    }
}
