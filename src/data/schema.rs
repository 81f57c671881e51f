//! Explicit column schema, resolved once when a table is loaded

use super::DataConfig;
use crate::error::{FraudError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Declared role of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Continuous or integer transaction attribute
    Numerical,
    /// Text-valued transaction attribute
    Categorical,
    /// Binary fraud label
    Label,
    /// Row identifier, never used as a model input
    Identifier,
}

impl ColumnKind {
    /// Whether a column of this kind may be chosen as a model input
    pub fn is_feature_candidate(self) -> bool {
        matches!(self, ColumnKind::Numerical | ColumnKind::Categorical)
    }
}

/// Single schema entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered mapping from column name to declared kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

/// Check if dtype is numeric
fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

impl Schema {
    /// Classify every column of `frame` and coerce it to its kind's physical type.
    ///
    /// Numerical and label columns become `Float64`, categorical columns become
    /// `String`. Configured overrides win over dtype inference.
    pub fn resolve(mut frame: DataFrame, config: &DataConfig) -> Result<(DataFrame, Self)> {
        Self::check_config(&frame, config)?;

        let names: Vec<String> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = frame.column(&name)?.clone();
            let kind = Self::classify(&column, config)?;
            if let Some(conformed) = Self::conform(&column, kind)? {
                frame.with_column(conformed)?;
            }
            columns.push(ColumnSpec { name, kind });
        }

        let schema = Self { columns };
        schema.check_label(&frame)?;
        Ok((frame, schema))
    }

    /// Get the kind of a column
    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    /// Iterate over columns in table order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    /// Names of all columns of the given kind, in table order
    pub fn names_of(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Names of columns that may become model inputs, in table order
    pub fn feature_candidates(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind.is_feature_candidate())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Name of the label column
    pub fn label(&self) -> &str {
        self.columns
            .iter()
            .find(|c| c.kind == ColumnKind::Label)
            .map(|c| c.name.as_str())
            .unwrap_or_default()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Verify that `frame` has exactly the columns this schema classifies
    pub fn validate(&self, frame: &DataFrame) -> Result<()> {
        for column in frame.get_columns() {
            let name = column.name().as_str();
            let Some(kind) = self.kind(name) else {
                return Err(FraudError::Schema(format!(
                    "column '{}' cannot be classified as numerical or categorical",
                    name
                )));
            };
            let expected_ok = match kind {
                ColumnKind::Numerical | ColumnKind::Label => column.dtype() == &DataType::Float64,
                ColumnKind::Categorical => column.dtype() == &DataType::String,
                ColumnKind::Identifier => true,
            };
            if !expected_ok {
                return Err(FraudError::Schema(format!(
                    "column '{}' declared {:?} but stored as {}",
                    name,
                    kind,
                    column.dtype()
                )));
            }
        }

        if frame.width() != self.columns.len() {
            return Err(FraudError::Schema(format!(
                "schema describes {} columns but table has {}",
                self.columns.len(),
                frame.width()
            )));
        }

        if self.names_of(ColumnKind::Label).len() != 1 {
            return Err(FraudError::Schema(
                "schema must contain exactly one label column".to_string(),
            ));
        }

        Ok(())
    }

    fn check_config(frame: &DataFrame, config: &DataConfig) -> Result<()> {
        let available: Vec<String> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let missing: Vec<&str> = std::iter::once(config.label_column.as_str())
            .chain(config.id_column.as_deref())
            .filter(|name| !available.iter().any(|a| a == name))
            .collect();
        if !missing.is_empty() {
            return Err(FraudError::Format(format!(
                "columns not found in input: {:?}. Available: {:?}",
                missing, available
            )));
        }

        if config.id_column.as_deref() == Some(config.label_column.as_str()) {
            return Err(FraudError::Config(format!(
                "'{}' cannot be both the label and the identifier column",
                config.label_column
            )));
        }

        for (name, kind) in &config.column_types {
            if !available.iter().any(|a| a == name) {
                return Err(FraudError::Config(format!(
                    "column_types references unknown column '{}'",
                    name
                )));
            }
            if !kind.is_feature_candidate() {
                return Err(FraudError::Config(format!(
                    "column_types may only declare numerical or categorical columns, got {:?} for '{}'",
                    kind, name
                )));
            }
            if *name == config.label_column || config.id_column.as_deref() == Some(name.as_str()) {
                return Err(FraudError::Config(format!(
                    "column_types cannot override the label or identifier column '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    fn classify(column: &Column, config: &DataConfig) -> Result<ColumnKind> {
        let name = column.name().as_str();
        if name == config.label_column {
            return Ok(ColumnKind::Label);
        }
        if config.id_column.as_deref() == Some(name) {
            return Ok(ColumnKind::Identifier);
        }
        if let Some(kind) = config.column_types.get(name) {
            return Ok(*kind);
        }

        match column.dtype() {
            dtype if is_numeric_dtype(dtype) => Ok(ColumnKind::Numerical),
            DataType::String => Ok(ColumnKind::Categorical),
            other => Err(FraudError::Schema(format!(
                "column '{}' has type {} which is neither numerical nor categorical; declare it in column_types",
                name, other
            ))),
        }
    }

    /// Cast a column to the physical type of its kind, or `None` if already conforming
    fn conform(column: &Column, kind: ColumnKind) -> Result<Option<Column>> {
        let name = column.name().as_str();
        let dtype = column.dtype();

        match kind {
            ColumnKind::Numerical | ColumnKind::Label => {
                if dtype == &DataType::Float64 {
                    return Ok(None);
                }
                let castable = is_numeric_dtype(dtype)
                    || matches!(dtype, DataType::Boolean | DataType::Null | DataType::String);
                if !castable {
                    return Err(FraudError::Schema(format!(
                        "column '{}' of type {} cannot be treated as numerical",
                        name, dtype
                    )));
                }
                let series = column
                    .as_materialized_series()
                    .strict_cast(&DataType::Float64)
                    .map_err(|_| {
                        FraudError::Schema(format!(
                            "column '{}' declared numerical but contains non-numeric values",
                            name
                        ))
                    })?;
                Ok(Some(Column::from(series)))
            }
            ColumnKind::Categorical => {
                if dtype == &DataType::String {
                    return Ok(None);
                }
                let castable = is_numeric_dtype(dtype)
                    || matches!(dtype, DataType::Boolean | DataType::Null);
                if !castable {
                    return Err(FraudError::Schema(format!(
                        "column '{}' of type {} cannot be treated as categorical",
                        name, dtype
                    )));
                }
                Ok(Some(column.cast(&DataType::String)?))
            }
            ColumnKind::Identifier => Ok(None),
        }
    }

    fn check_label(&self, frame: &DataFrame) -> Result<()> {
        let name = self.label();
        let series = frame.column(name)?.as_materialized_series().clone();
        let values = series.f64()?;

        let n_missing = values.null_count();
        if n_missing > 0 {
            return Err(FraudError::Schema(format!(
                "label column '{}' has {} missing values",
                name, n_missing
            )));
        }

        if let Some(bad) = values
            .into_iter()
            .flatten()
            .find(|v| *v != 0.0 && *v != 1.0)
        {
            return Err(FraudError::Schema(format!(
                "label column '{}' must be binary (0/1), found {}",
                name, bad
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df!(
            "id" => &["t1", "t2", "t3"],
            "amount" => &[12.5, 80.0, 3.2],
            "hour" => &[1i64, 14, 23],
            "merchant" => &["grocery", "travel", "grocery"],
            "Class" => &[0i64, 1, 0]
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_infers_kinds() {
        let config = DataConfig::csv("Class").with_id_column("id");
        let (frame, schema) = Schema::resolve(sample_frame(), &config).unwrap();

        assert_eq!(schema.kind("id"), Some(ColumnKind::Identifier));
        assert_eq!(schema.kind("amount"), Some(ColumnKind::Numerical));
        assert_eq!(schema.kind("hour"), Some(ColumnKind::Numerical));
        assert_eq!(schema.kind("merchant"), Some(ColumnKind::Categorical));
        assert_eq!(schema.label(), "Class");
        assert_eq!(schema.feature_candidates(), vec!["amount", "hour", "merchant"]);

        assert_eq!(frame.column("hour").unwrap().dtype(), &DataType::Float64);
        assert_eq!(frame.column("Class").unwrap().dtype(), &DataType::Float64);
        schema.validate(&frame).unwrap();
    }

    #[test]
    fn test_override_numeric_to_categorical() {
        let config = DataConfig::csv("Class").with_column_type("hour", ColumnKind::Categorical);
        let (frame, schema) = Schema::resolve(sample_frame(), &config).unwrap();

        assert_eq!(schema.kind("hour"), Some(ColumnKind::Categorical));
        assert_eq!(frame.column("hour").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_unclassifiable_column() {
        let df = df!(
            "flag" => &[true, false],
            "Class" => &[0.0, 1.0]
        )
        .unwrap();

        let err = Schema::resolve(df, &DataConfig::csv("Class")).unwrap_err();
        assert!(matches!(err, FraudError::Schema(ref msg) if msg.contains("flag")));
    }

    #[test]
    fn test_missing_label_column() {
        let err = Schema::resolve(sample_frame(), &DataConfig::csv("is_fraud")).unwrap_err();
        assert!(matches!(err, FraudError::Format(ref msg) if msg.contains("is_fraud")));
    }

    #[test]
    fn test_non_binary_label() {
        let df = df!(
            "amount" => &[1.0, 2.0],
            "Class" => &[0.0, 2.0]
        )
        .unwrap();

        let err = Schema::resolve(df, &DataConfig::csv("Class")).unwrap_err();
        assert!(matches!(err, FraudError::Schema(_)));
    }

    #[test]
    fn test_override_unknown_column() {
        let config = DataConfig::csv("Class").with_column_type("amout", ColumnKind::Numerical);
        let err = Schema::resolve(sample_frame(), &config).unwrap_err();
        assert!(matches!(err, FraudError::Config(ref msg) if msg.contains("amout")));
    }
}
