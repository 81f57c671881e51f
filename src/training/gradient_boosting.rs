//! Gradient boosted trees for binary log-loss

use super::config::GbParams;
use super::decision_tree::DecisionTree;
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Keeps the initial log-odds finite for single-class targets
const PROB_EPS: f64 = 1e-15;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    params: GbParams,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
    feature_importances: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(params: GbParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            initial_log_odds: 0.0,
            feature_importances: Vec::new(),
        }
    }

    pub fn params(&self) -> &GbParams {
        &self.params
    }

    /// Fit by repeatedly regressing a tree on the log-loss residuals `y - p`
    /// of a row subsample and adding its shrunk output to every row's log-odds.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 {
            return Err(FraudError::Training("cannot boost on zero rows".to_string()));
        }

        let p = y.mean().unwrap_or(0.5).clamp(PROB_EPS, 1.0 - PROB_EPS);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        self.trees.clear();
        self.feature_importances = vec![0.0; n_features];

        for _ in 0..self.params.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(log_odds.iter())
                .map(|(&yi, &lo)| yi - sigmoid(lo))
                .collect();

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let r_sub = residuals.select(Axis(0), &sample_indices);

            let mut tree = DecisionTree::regressor()
                .with_max_depth(self.params.max_depth)
                .with_min_samples_leaf(self.params.min_samples_leaf);
            tree.fit(&x_sub, &r_sub, &mut rng)?;

            let update = tree.predict(x)?;
            log_odds.scaled_add(self.params.learning_rate, &update);

            for (acc, &imp) in self.feature_importances.iter_mut().zip(tree.feature_importances()) {
                *acc += imp;
            }
            self.trees.push(tree);
        }

        if log_odds.iter().any(|v| !v.is_finite()) {
            return Err(FraudError::Training("boosting diverged to non-finite log-odds".to_string()));
        }

        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }

        Ok(())
    }

    /// Fraud probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let update = tree.predict(x)?;
            log_odds.scaled_add(self.params.learning_rate, &update);
        }
        Ok(log_odds.mapv(sigmoid))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// `ceil(n * subsample)` distinct rows in ascending order
    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        if self.params.subsample >= 1.0 {
            return indices;
        }
        let sample_size = ((n as f64) * self.params.subsample).ceil().max(1.0) as usize;
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::metrics::log_loss;

    fn params(subsample: f64) -> GbParams {
        GbParams {
            n_estimators: 30,
            learning_rate: 0.3,
            max_depth: 2,
            min_samples_leaf: 1,
            subsample,
        }
    }

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 5) as f64 });
        let y = Array1::from_iter((0..50).map(|i| if i % 10 >= 7 { 1.0 } else { 0.0 }));
        (x, y)
    }

    #[test]
    fn test_boosting_reduces_log_loss() {
        let (x, y) = data();
        let mut model = GradientBoostingClassifier::new(params(1.0));
        model.fit(&x, &y, 0).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        let baseline = log_loss(y.view(), Array1::from_elem(50, 0.3).view());
        assert!(log_loss(y.view(), proba.view()) < baseline);
        assert_eq!(model.n_trees(), 30);
    }

    #[test]
    fn test_subsample_seeded() {
        let (x, y) = data();
        let mut a = GradientBoostingClassifier::new(params(0.6));
        let mut b = GradientBoostingClassifier::new(params(0.6));
        a.fit(&x, &y, 5).unwrap();
        b.fit(&x, &y, 5).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_single_class_stays_finite() {
        let (x, _) = data();
        let y = Array1::zeros(50);
        let mut model = GradientBoostingClassifier::new(params(1.0));
        model.fit(&x, &y, 0).unwrap();
        assert!(model.predict_proba(&x).unwrap().iter().all(|p| p.is_finite()));
    }
}
