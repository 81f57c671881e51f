//! Raw dataset as produced by the loader

use super::{DataConfig, Schema};
use crate::error::Result;
use polars::prelude::*;

/// Loaded transaction table together with its resolved schema
#[derive(Debug, Clone)]
pub struct RawDataset {
    frame: DataFrame,
    schema: Schema,
}

impl RawDataset {
    /// Resolve the schema of an in-memory frame
    pub fn from_frame(frame: DataFrame, config: &DataConfig) -> Result<Self> {
        let (frame, schema) = Schema::resolve(frame, config)?;
        Ok(Self { frame, schema })
    }

    /// Underlying table
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Resolved schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Split into table and schema
    pub fn into_parts(self) -> (DataFrame, Schema) {
        (self.frame, self.schema)
    }
}
