//! Fitted models and the persisted artifact

use super::config::{HyperParams, ModelFamily};
use super::gradient_boosting::GradientBoostingClassifier;
use super::random_forest::RandomForestClassifier;
use crate::error::{FraudError, Result};
use crate::evaluation::MetricName;
use crate::features::CategoryEncoding;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fitted predictor of either family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TrainedModel {
    GradientBoosting(GradientBoostingClassifier),
    RandomForest(RandomForestClassifier),
}

impl TrainedModel {
    /// Fit a fresh model for `params`
    pub fn fit(params: &HyperParams, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<Self> {
        match params {
            HyperParams::GradientBoosting(p) => {
                let mut model = GradientBoostingClassifier::new(p.clone());
                model.fit(x, y, seed)?;
                Ok(TrainedModel::GradientBoosting(model))
            }
            HyperParams::RandomForest(p) => {
                let mut model = RandomForestClassifier::new(p.clone());
                model.fit(x, y, seed)?;
                Ok(TrainedModel::RandomForest(model))
            }
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            TrainedModel::GradientBoosting(_) => ModelFamily::GradientBoosting,
            TrainedModel::RandomForest(_) => ModelFamily::RandomForest,
        }
    }

    /// Fraud probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::GradientBoosting(m) => m.predict_proba(x),
            TrainedModel::RandomForest(m) => m.predict_proba(x),
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        match self {
            TrainedModel::GradientBoosting(m) => m.feature_importances(),
            TrainedModel::RandomForest(m) => m.feature_importances(),
        }
    }
}

/// Winning model with everything needed to interpret it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub family: ModelFamily,
    pub params: HyperParams,
    pub objective: MetricName,
    /// Mean cross-validated objective of the winning candidate
    pub cv_score: f64,
    pub cv_std: f64,
    pub feature_names: Vec<String>,
    pub label: String,
    pub encodings: Vec<CategoryEncoding>,
    pub seed: u64,
    pub n_training_samples: usize,
    pub trained_at: DateTime<Utc>,
    pub version: String,
    pub model: TrainedModel,
}

impl ModelArtifact {
    /// Fraud probabilities for a matrix whose columns follow `feature_names`
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.feature_names.len() {
            return Err(FraudError::Evaluation(format!(
                "model expects {} features, got {}",
                self.feature_names.len(),
                x.ncols()
            )));
        }
        self.model.predict_proba(x)
    }

    /// (feature, importance) pairs, most important first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.model.feature_importances().iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs
    }

    /// Save the artifact as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load an artifact written by [`ModelArtifact::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&json)?;
        Ok(artifact)
    }
}
