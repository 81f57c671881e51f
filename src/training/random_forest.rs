//! Random forest classifier

use super::config::RfParams;
use super::decision_tree::DecisionTree;
use super::derive_seed;
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagged Gini trees; the predicted probability is the mean leaf probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: RfParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl RandomForestClassifier {
    pub fn new(params: RfParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn params(&self) -> &RfParams {
        &self.params
    }

    /// Fit every tree on its own bootstrap sample.
    ///
    /// Trees are built on the current rayon pool; tree `t` draws from a
    /// generator seeded by `(seed, t)` so the forest is independent of
    /// scheduling.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 {
            return Err(FraudError::Training("cannot fit a forest on zero rows".to_string()));
        }

        let max_features = self.params.max_features.resolve(n_features);
        let params = &self.params;

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, &[tree_idx as u64]));

                let sample_indices: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot = y.select(Axis(0), &sample_indices);

                let mut tree = DecisionTree::classifier()
                    .with_max_depth(params.max_depth)
                    .with_min_samples_leaf(params.min_samples_leaf)
                    .with_max_features(max_features);
                tree.fit(&x_boot, &y_boot, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.n_features = n_features;
        self.trees = trees;
        self.compute_feature_importances();

        Ok(())
    }

    fn compute_feature_importances(&mut self) {
        let mut total_importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, &val) in total_importances.iter_mut().zip(tree.feature_importances()) {
                *acc += val;
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }
        self.feature_importances = total_importances;
    }

    /// Fraud probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(FraudError::Training("forest is not fitted".to_string()));
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for preds in &all_predictions {
            sum += preds;
        }
        Ok(sum / self.trees.len() as f64)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}
