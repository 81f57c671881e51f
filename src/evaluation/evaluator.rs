//! Held-out evaluation of a trained model

use super::metrics::{ConfusionMatrix, MetricName};
use crate::error::{FraudError, Result};
use crate::features::FeatureSet;
use crate::training::{ModelArtifact, ModelFamily};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Metrics of one model on one held-out partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub family: ModelFamily,
    pub threshold: f64,
    pub n_samples: usize,
    pub n_positives: usize,
    pub metrics: BTreeMap<MetricName, f64>,
    pub confusion: ConfusionMatrix,
}

impl MetricsReport {
    /// Value of one metric
    pub fn get(&self, name: MetricName) -> Option<f64> {
        self.metrics.get(&name).copied()
    }

    /// `metric,value` rows: every metric, then the confusion counts and threshold
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut names: Vec<String> = self.metrics.keys().map(|m| m.as_str().to_string()).collect();
        let mut values: Vec<f64> = self.metrics.values().copied().collect();

        let cm = &self.confusion;
        for (name, value) in [
            ("true_positives", cm.true_positives as f64),
            ("false_positives", cm.false_positives as f64),
            ("true_negatives", cm.true_negatives as f64),
            ("false_negatives", cm.false_negatives as f64),
            ("threshold", self.threshold),
        ] {
            names.push(name.to_string());
            values.push(value);
        }

        let df = df!(
            "metric" => names,
            "value" => values
        )?;
        Ok(df)
    }

    /// Write the report as pretty-printed JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Write the `metric,value` table as CSV
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_frame()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        Ok(())
    }
}

/// Scores a model artifact against a held-out feature set
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    threshold: f64,
}

impl Evaluator {
    /// `threshold` is the probability at or above which a row is flagged
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compute every metric; never mutates the model
    pub fn evaluate(&self, artifact: &ModelArtifact, data: &FeatureSet) -> Result<MetricsReport> {
        if !(self.threshold.is_finite() && (0.0..=1.0).contains(&self.threshold)) {
            return Err(FraudError::Config(format!(
                "decision threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }

        if data.n_samples() == 0 {
            return Err(FraudError::Evaluation("held-out partition is empty".to_string()));
        }

        let (negatives, positives) = data.class_counts();
        if negatives == 0 || positives == 0 {
            return Err(FraudError::Evaluation(format!(
                "held-out partition contains a single class ({} negatives, {} positives)",
                negatives, positives
            )));
        }

        if data.feature_names() != artifact.feature_names.as_slice() {
            return Err(FraudError::Evaluation(format!(
                "held-out features {:?} do not match the model's {:?}",
                data.feature_names(),
                artifact.feature_names
            )));
        }

        let proba = artifact
            .predict_proba(data.x())
            .map_err(|e| FraudError::Evaluation(e.to_string()))?;
        if proba.iter().any(|p| !p.is_finite()) {
            return Err(FraudError::Evaluation("model produced non-finite probabilities".to_string()));
        }

        let y = data.y().view();
        let metrics: BTreeMap<MetricName, f64> = MetricName::ALL
            .iter()
            .map(|&m| (m, m.compute(y, proba.view(), self.threshold)))
            .collect();
        let confusion = ConfusionMatrix::from_probabilities(y, proba.view(), self.threshold);

        let report = MetricsReport {
            family: artifact.family,
            threshold: self.threshold,
            n_samples: data.n_samples(),
            n_positives: positives,
            metrics,
            confusion,
        };

        info!(
            n_samples = report.n_samples,
            n_positives = positives,
            roc_auc = report.get(MetricName::RocAuc).unwrap_or_default(),
            average_precision = report.get(MetricName::AveragePrecision).unwrap_or_default(),
            f1 = report.get(MetricName::F1).unwrap_or_default(),
            "Evaluation complete"
        );

        Ok(report)
    }
}
