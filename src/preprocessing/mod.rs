//! Data cleaning module
//!
//! Provides the preprocessing stage of the pipeline:
//! - Exact duplicate row removal (first occurrence wins)
//! - Numerical imputation with a configured statistic per column
//! - Categorical imputation with the `MISSING_VALUE` sentinel

mod config;
mod dedup;
mod imputer;
mod pipeline;

pub use config::{NumericStatistic, PreprocessingConfig};
pub use dedup::drop_duplicate_rows;
pub use imputer::{compute_statistic, CategoricalImputation, NumericImputation, MISSING_VALUE};
pub use pipeline::Preprocessor;

use crate::data::Schema;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// What the preprocessor changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub numeric: Vec<NumericImputation>,
    pub categorical: Vec<CategoricalImputation>,
}

impl PreprocessingSummary {
    /// Total numerical cells that were imputed
    pub fn numeric_cells_filled(&self) -> usize {
        self.numeric.iter().map(|n| n.filled).sum()
    }

    /// Total categorical cells set to the sentinel
    pub fn categorical_cells_filled(&self) -> usize {
        self.categorical.iter().map(|c| c.filled).sum()
    }
}

/// Deduplicated table with no missing numerical or categorical values
#[derive(Debug, Clone)]
pub struct CleanDataset {
    frame: DataFrame,
    schema: Schema,
    summary: PreprocessingSummary,
}

impl CleanDataset {
    pub(crate) fn new(frame: DataFrame, schema: Schema, summary: PreprocessingSummary) -> Self {
        Self { frame, schema, summary }
    }

    /// Underlying table
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Schema carried over from the raw dataset
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Cleaning summary
    pub fn summary(&self) -> &PreprocessingSummary {
        &self.summary
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }
}
