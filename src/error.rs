//! Error types for the fraudclf pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, FraudError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum FraudError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FraudError {
    /// Short machine-readable name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            FraudError::Io(_) => "IOError",
            FraudError::Format(_) => "FormatError",
            FraudError::Schema(_) => "SchemaError",
            FraudError::Config(_) => "ConfigError",
            FraudError::Training(_) => "TrainingError",
            FraudError::Evaluation(_) => "EvaluationError",
            FraudError::Serialization(_) => "SerializationError",
        }
    }
}

impl From<polars::error::PolarsError> for FraudError {
    fn from(err: polars::error::PolarsError) -> Self {
        FraudError::Format(err.to_string())
    }
}

impl From<serde_json::Error> for FraudError {
    fn from(err: serde_json::Error) -> Self {
        FraudError::Serialization(err.to_string())
    }
}
