//! Data loading configuration

use super::ColumnKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for reading the transaction file and classifying its columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Binary (0/1) fraud label column
    pub label_column: String,

    /// Optional row identifier, carried through cleaning but never a feature
    #[serde(default)]
    pub id_column: Option<String>,

    /// Field separator
    pub delimiter: char,

    /// Whether the first row names the columns
    pub has_header: bool,

    /// Extra tokens read as missing, in addition to empty fields
    #[serde(default)]
    pub null_values: Vec<String>,

    /// Explicit column classifications that take precedence over inference
    #[serde(default)]
    pub column_types: BTreeMap<String, ColumnKind>,
}

impl DataConfig {
    /// Comma-separated file with a header row
    pub fn csv(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
            id_column: None,
            delimiter: ',',
            has_header: true,
            null_values: Vec::new(),
            column_types: BTreeMap::new(),
        }
    }

    /// Builder method to set the identifier column
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Builder method to set the delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Builder method to add a missing-value token
    pub fn with_null_value(mut self, token: impl Into<String>) -> Self {
        self.null_values.push(token.into());
        self
    }

    /// Builder method to force a column's classification
    pub fn with_column_type(mut self, column: impl Into<String>, kind: ColumnKind) -> Self {
        self.column_types.insert(column.into(), kind);
        self
    }
}
