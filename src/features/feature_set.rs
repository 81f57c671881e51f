//! Numeric model inputs

use super::CategoryEncoding;
use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Feature matrix plus binary label vector.
///
/// Rows line up with the clean dataset rows they were built from (or a
/// subset of them after a split). Columns follow `feature_names`.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    feature_names: Vec<String>,
    label: String,
    x: Array2<f64>,
    y: Array1<f64>,
    encodings: Vec<CategoryEncoding>,
}

impl FeatureSet {
    /// Assemble a feature set, checking shapes and the label/feature split
    pub fn new(
        feature_names: Vec<String>,
        label: impl Into<String>,
        x: Array2<f64>,
        y: Array1<f64>,
        encodings: Vec<CategoryEncoding>,
    ) -> Result<Self> {
        let label = label.into();

        if feature_names.is_empty() {
            return Err(FraudError::Config("no feature columns selected".to_string()));
        }
        if feature_names.iter().any(|f| *f == label) {
            return Err(FraudError::Config(format!(
                "label column '{}' cannot be a feature",
                label
            )));
        }
        if x.ncols() != feature_names.len() {
            return Err(FraudError::Format(format!(
                "feature matrix has {} columns but {} names",
                x.ncols(),
                feature_names.len()
            )));
        }
        if x.nrows() != y.len() {
            return Err(FraudError::Format(format!(
                "feature matrix has {} rows but label has {}",
                x.nrows(),
                y.len()
            )));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(FraudError::Schema(format!(
                "label '{}' must contain only 0 and 1",
                label
            )));
        }

        Ok(Self {
            feature_names,
            label,
            x,
            y,
            encodings,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Feature matrix, `n_samples × n_features`
    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Label vector of 0.0 / 1.0
    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    /// Ordinal encodings of the categorical features
    pub fn encodings(&self) -> &[CategoryEncoding] {
        &self.encodings
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// (negatives, positives)
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.y.iter().filter(|&&v| v == 1.0).count();
        (self.y.len() - positives, positives)
    }

    /// Rows at `indices`, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> FeatureSet {
        FeatureSet {
            feature_names: self.feature_names.clone(),
            label: self.label.clone(),
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            encodings: self.encodings.clone(),
        }
    }

    /// Split into (train, held-out) keeping class proportions.
    ///
    /// Each class is shuffled with its own seeded generator and contributes
    /// `round(len * test_fraction)` rows to the held-out side, clamped so a
    /// class with at least two rows lands on both sides. Both sides keep the
    /// original row order.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> Result<(FeatureSet, FeatureSet)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(FraudError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }

        let mut train_idx = Vec::with_capacity(self.n_samples());
        let mut test_idx = Vec::new();

        for (class_offset, class) in [0.0, 1.0].into_iter().enumerate() {
            let mut members: Vec<usize> = self
                .y
                .iter()
                .enumerate()
                .filter(|(_, &v)| v == class)
                .map(|(i, _)| i)
                .collect();

            if members.is_empty() {
                continue;
            }

            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(class_offset as u64));
            members.shuffle(&mut rng);

            let n = members.len();
            let n_test = if n < 2 {
                0
            } else {
                ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
            };

            test_idx.extend_from_slice(&members[..n_test]);
            train_idx.extend_from_slice(&members[n_test..]);
        }

        train_idx.sort_unstable();
        test_idx.sort_unstable();

        Ok((self.select_rows(&train_idx), self.select_rows(&test_idx)))
    }
}
