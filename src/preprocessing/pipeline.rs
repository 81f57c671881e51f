//! Data cleaning stage

use super::{
    config::PreprocessingConfig,
    dedup::drop_duplicate_rows,
    imputer::{compute_statistic, fill_categorical, fill_numeric, CategoricalImputation, NumericImputation},
    CleanDataset, PreprocessingSummary,
};
use crate::data::{ColumnKind, RawDataset};
use crate::error::Result;
use std::time::Instant;
use tracing::{debug, info};

/// Turns a raw dataset into a clean one: dedup, numeric fill, categorical sentinel
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessingConfig,
}

impl Preprocessor {
    /// Create a new preprocessor
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Preprocessing configuration
    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Run all three cleaning steps.
    ///
    /// Works on owned copies of the raw table; either every step completes
    /// and a [`CleanDataset`] is returned, or nothing is produced.
    pub fn run(&self, raw: RawDataset) -> Result<CleanDataset> {
        let start = Instant::now();
        let (frame, schema) = raw.into_parts();

        schema.validate(&frame)?;
        self.config.validate(&schema)?;

        let rows_in = frame.height();
        let (mut frame, duplicates_removed) = drop_duplicate_rows(&frame)?;
        debug!(duplicates_removed, "Removed duplicate rows");

        let mut numeric = Vec::new();
        for name in schema.names_of(ColumnKind::Numerical) {
            let series = frame.column(name)?.as_materialized_series().clone();
            let statistic = self.config.statistic_for(name);
            let fill_value = compute_statistic(name, series.f64()?, statistic)?;
            let (filled_series, filled) = fill_numeric(&series, fill_value)?;
            if filled > 0 {
                frame.with_column(filled_series)?;
                debug!(column = name, ?statistic, fill_value, filled, "Imputed numerical column");
            }
            numeric.push(NumericImputation {
                column: name.to_string(),
                statistic,
                fill_value,
                filled,
            });
        }

        let mut categorical = Vec::new();
        for name in schema.names_of(ColumnKind::Categorical) {
            let series = frame.column(name)?.as_materialized_series().clone();
            let (filled_series, filled) = fill_categorical(&series)?;
            if filled > 0 {
                frame.with_column(filled_series)?;
                debug!(column = name, filled, "Filled missing categories");
            }
            categorical.push(CategoricalImputation {
                column: name.to_string(),
                filled,
            });
        }

        let summary = PreprocessingSummary {
            rows_in,
            rows_out: frame.height(),
            duplicates_removed,
            numeric,
            categorical,
        };

        info!(
            rows_in,
            rows_out = summary.rows_out,
            duplicates_removed,
            numeric_cells_filled = summary.numeric_cells_filled(),
            categorical_cells_filled = summary.categorical_cells_filled(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessing complete"
        );

        Ok(CleanDataset::new(frame, schema, summary))
    }
}
