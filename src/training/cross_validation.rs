//! Stratified k-fold cross-validation

use crate::error::{FraudError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter.
///
/// Rows of each class are shuffled with one seeded generator and dealt
/// round-robin onto the folds, continuing where the previous class stopped
/// so fold sizes differ by at most one.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Generate `n_splits` splits over a 0/1 target
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(FraudError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.n_splits
            )));
        }

        // Ordered by class so the shuffle sequence is reproducible
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if class_indices.len() < 2 {
            return Err(FraudError::Config(
                "stratified folds need both classes in the training data".to_string(),
            ));
        }
        if let Some((class, members)) = class_indices.iter().find(|(_, m)| m.len() < self.n_splits) {
            return Err(FraudError::Config(format!(
                "cv_folds = {} exceeds the {} rows of class {}",
                self.n_splits,
                members.len(),
                class
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut next_fold = 0;

        for indices in class_indices.values_mut() {
            indices.shuffle(&mut rng);
            for &idx in indices.iter() {
                folds[next_fold].push(idx);
                next_fold = (next_fold + 1) % self.n_splits;
            }
        }

        for fold in &mut folds {
            fold.sort_unstable();
        }

        let splits = (0..self.n_splits)
            .map(|fold_idx| {
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();

                CVSplit {
                    train_indices,
                    test_indices: folds[fold_idx].clone(),
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Cross-validation results for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Population standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
