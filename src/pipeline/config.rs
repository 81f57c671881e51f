//! Pipeline configuration document

use crate::data::DataConfig;
use crate::error::{FraudError, Result};
use crate::evaluation::MetricName;
use crate::features::{ScoreMethod, SelectionConfig, SplitConfig};
use crate::preprocessing::{NumericStatistic, PreprocessingConfig};
use crate::training::{FamilyGrid, GbGrid, MaxFeatures, RfGrid, SearchConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Final evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Probability at or above which a transaction is flagged
    pub threshold: f64,
}

/// Complete run configuration: one section per stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub preprocessing: PreprocessingConfig,
    pub selection: SelectionConfig,
    pub split: SplitConfig,
    pub search: SearchConfig,
    pub evaluation: EvaluationConfig,
}

impl PipelineConfig {
    /// Explicit starting point for a dataset labelled by `label_column`
    pub fn template(label_column: impl Into<String>) -> Self {
        Self {
            data: DataConfig::csv(label_column),
            preprocessing: PreprocessingConfig::new(NumericStatistic::Median),
            selection: SelectionConfig::auto(ScoreMethod::MutualInformation, 0.0),
            split: SplitConfig::new(0.2, 42),
            search: SearchConfig::new(MetricName::AveragePrecision, 5, 42)
                .with_family(FamilyGrid::GradientBoosting(GbGrid {
                    n_estimators: vec![100, 200],
                    learning_rate: vec![0.05, 0.1],
                    max_depth: vec![3],
                    min_samples_leaf: vec![5],
                    subsample: vec![0.8],
                }))
                .with_family(FamilyGrid::RandomForest(RfGrid {
                    n_estimators: vec![200],
                    max_depth: vec![8, 12],
                    min_samples_leaf: vec![2],
                    max_features: vec![MaxFeatures::Sqrt],
                }))
                .with_n_jobs(4)
                .with_max_fits(200),
            evaluation: EvaluationConfig { threshold: 0.5 },
        }
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FraudError::Config(format!("invalid pipeline config: {}", e)))
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Builder method to override the worker count
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.search.n_jobs = n_jobs;
        self
    }

    /// Checks that need no data
    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        self.search.validate()?;
        let threshold = self.evaluation.threshold;
        if !(threshold.is_finite() && (0.0..=1.0).contains(&threshold)) {
            return Err(FraudError::Config(format!(
                "evaluation threshold must be in [0, 1], got {}",
                threshold
            )));
        }
        Ok(())
    }
}
