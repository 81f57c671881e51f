//! Feature selection and hold-out split configuration

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};

/// Scoring function for automatic selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    /// Mutual information with the label over equal-width bins
    MutualInformation,
    /// Absolute Pearson correlation with the label
    Correlation,
    /// Population variance of the column (label-independent)
    Variance,
}

/// How model inputs are chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionConfig {
    /// Exactly these columns, in this order
    AllowList { columns: Vec<String> },
    /// Every candidate column scoring at least `threshold`, best first
    Auto {
        method: ScoreMethod,
        threshold: f64,
        #[serde(default)]
        max_features: Option<usize>,
    },
}

impl SelectionConfig {
    /// Allow-list selection
    pub fn allow_list<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectionConfig::AllowList {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Score-based selection
    pub fn auto(method: ScoreMethod, threshold: f64) -> Self {
        SelectionConfig::Auto {
            method,
            threshold,
            max_features: None,
        }
    }

    /// Builder method to cap the number of automatically selected columns
    pub fn with_max_features(self, k: usize) -> Self {
        match self {
            SelectionConfig::Auto { method, threshold, .. } => SelectionConfig::Auto {
                method,
                threshold,
                max_features: Some(k),
            },
            other => other,
        }
    }
}

/// Held-out partition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Share of rows (per class) reserved for final evaluation
    pub test_fraction: f64,
    /// Seed for the per-class shuffle
    pub seed: u64,
}

impl SplitConfig {
    pub fn new(test_fraction: f64, seed: u64) -> Self {
        Self { test_fraction, seed }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(FraudError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_deserialize() {
        let json = r#"{"policy": "allow_list", "columns": ["V1", "Amount"]}"#;
        let config: SelectionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, SelectionConfig::allow_list(["V1", "Amount"]));

        let json = r#"{"policy": "auto", "method": "mutual_information", "threshold": 0.01}"#;
        let config: SelectionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, SelectionConfig::auto(ScoreMethod::MutualInformation, 0.01));
    }

    #[test]
    fn test_split_validate() {
        assert!(SplitConfig::new(0.2, 7).validate().is_ok());
        assert!(SplitConfig::new(0.0, 7).validate().is_err());
        assert!(SplitConfig::new(1.0, 7).validate().is_err());
    }
}
