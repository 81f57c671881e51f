//! Binary decision tree used by both ensembles
//!
//! Leaves store the mean target of their samples: the fraud probability for
//! the Gini tree grown by the forest, the mean residual for the squared-error
//! tree grown by boosting.

use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest impurity decrease that counts as a split
const MIN_GAIN: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity of a 0/1 target
    Gini,
    /// Mean squared error
    Mse,
}

impl Criterion {
    /// Impurity from count, sum and sum of squares
    fn impurity(self, count: usize, sum: f64, sq_sum: f64) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        match self {
            Criterion::Gini => {
                let p = sum / n;
                2.0 * p * (1.0 - p)
            }
            Criterion::Mse => (sq_sum / n - (sum / n).powi(2)).max(0.0),
        }
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (root is depth 0)
    pub max_depth: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features tried per split; all when `None`
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    /// Gini tree over a 0/1 target
    pub fn classifier() -> Self {
        Self::with_criterion(Criterion::Gini)
    }

    /// Squared-error tree over a real target
    pub fn regressor() -> Self {
        Self::with_criterion(Criterion::Mse)
    }

    fn with_criterion(criterion: Criterion) -> Self {
        Self {
            root: None,
            max_depth: usize::MAX,
            min_samples_leaf: 1,
            max_features: None,
            criterion,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set the number of features sampled at each split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Fit the tree. `rng` drives per-split feature sampling only.
    pub fn fit<R: Rng + ?Sized>(&mut self, x: &Array2<f64>, y: &Array1<f64>, rng: &mut R) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(FraudError::Training(format!(
                "tree got {} rows but {} targets",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 || n_features == 0 {
            return Err(FraudError::Training("cannot fit a tree on an empty matrix".to_string()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(FraudError::Training("non-finite value in tree input".to_string()));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = importances;

        Ok(())
    }

    fn build_tree<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let sq_sum: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let impurity = self.criterion.impurity(n_samples, sum, sq_sum);
        let leaf = TreeNode::Leaf {
            value: sum / n_samples as f64,
            n_samples,
        };

        if depth >= self.max_depth || n_samples < 2 * self.min_samples_leaf || impurity <= MIN_GAIN {
            return leaf;
        }

        let features = self.candidate_features(rng);
        let Some(best) = self.find_best_split(x, y, indices, &features, impurity, sum, sq_sum) else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Features to scan at one node, ascending
    fn candidate_features<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut picked = sample(rng, self.n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Sorted sweep per feature; first feature and lowest threshold win ties
    #[allow(clippy::too_many_arguments)]
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
        total_sum: f64,
        total_sq_sum: f64,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for &feature_idx in features {
            order.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

            let mut left_sum = 0.0;
            let mut left_sq_sum = 0.0;

            for k in 0..n - 1 {
                let yi = y[order[k]];
                left_sum += yi;
                left_sq_sum += yi * yi;

                let value = x[[order[k], feature_idx]];
                let next = x[[order[k + 1], feature_idx]];
                if value == next {
                    continue;
                }

                let left_count = k + 1;
                let right_count = n - left_count;
                if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }

                let left_impurity = self.criterion.impurity(left_count, left_sum, left_sq_sum);
                let right_impurity = self.criterion.impurity(
                    right_count,
                    total_sum - left_sum,
                    total_sq_sum - left_sq_sum,
                );
                let weighted =
                    (left_count as f64 * left_impurity + right_count as f64 * right_impurity) / n as f64;
                let gain = parent_impurity - weighted;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(BestSplit {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Predict leaf values
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| FraudError::Training("tree is not fitted".to_string()))?;

        if x.ncols() != self.n_features {
            return Err(FraudError::Training(format!(
                "tree expects {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        Ok(x.rows().into_iter().map(|row| Self::predict_row(root, row)).collect())
    }

    fn predict_row(node: &TreeNode, row: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_row(left, row)
                } else {
                    Self::predict_row(right, row)
                }
            }
        }
    }

    /// Normalised impurity decrease per feature
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Number of levels (a lone leaf is depth 1)
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }
}
