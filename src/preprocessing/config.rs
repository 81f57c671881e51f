//! Preprocessing configuration

use crate::data::{ColumnKind, Schema};
use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Central-tendency statistic used to fill missing numerical cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericStatistic {
    /// Arithmetic mean of observed values
    Mean,
    /// Median of observed values (average of the two middle values for even counts)
    Median,
    /// Most frequent observed value, smallest value on ties
    Mode,
}

/// Configuration for data cleaning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Statistic for every numerical column without an override
    pub numeric_statistic: NumericStatistic,

    /// Per-column statistic overrides
    #[serde(default)]
    pub column_statistics: BTreeMap<String, NumericStatistic>,
}

impl PreprocessingConfig {
    /// Create a configuration with one statistic for all numerical columns
    pub fn new(numeric_statistic: NumericStatistic) -> Self {
        Self {
            numeric_statistic,
            column_statistics: BTreeMap::new(),
        }
    }

    /// Builder method to override the statistic for one column
    pub fn with_column_statistic(mut self, column: impl Into<String>, statistic: NumericStatistic) -> Self {
        self.column_statistics.insert(column.into(), statistic);
        self
    }

    /// Statistic that applies to `column`
    pub fn statistic_for(&self, column: &str) -> NumericStatistic {
        self.column_statistics
            .get(column)
            .copied()
            .unwrap_or(self.numeric_statistic)
    }

    /// Check that every override targets a numerical column of `schema`
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for column in self.column_statistics.keys() {
            match schema.kind(column) {
                Some(ColumnKind::Numerical) => {}
                Some(kind) => {
                    return Err(FraudError::Config(format!(
                        "imputation override for '{}' which is {:?}, not numerical",
                        column, kind
                    )))
                }
                None => {
                    return Err(FraudError::Config(format!(
                        "imputation override references unknown column '{}'",
                        column
                    )))
                }
            }
        }
        Ok(())
    }
}
