//! fraudclf - credit-card fraud classifier training
//!
//! A linear batch pipeline that turns a delimited transaction file into a
//! persisted fraud model and a metrics report:
//!
//! 1. [`data`] - load the file and resolve column roles
//! 2. [`preprocessing`] - drop duplicate rows, impute missing values
//! 3. [`features`] - choose feature columns, encode them, split off a hold-out set
//! 4. [`training`] - cross-validated grid search over gradient boosting and random forests
//! 5. [`evaluation`] - score the selected model on the hold-out set
//!
//! [`pipeline`] wires the stages together from a single [`pipeline::PipelineConfig`];
//! [`cli`] exposes it as the `fraudclf` binary.
//!
//! # Example
//!
//! ```no_run
//! use fraudclf::pipeline::{OutputPaths, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::load("fraudclf.json")?;
//! let output = Pipeline::new(config)
//!     .run_and_write("transactions.csv", &OutputPaths::new("model.json", "metrics.json"))?;
//! println!("held-out roc_auc: {:?}", output.metrics.get(fraudclf::evaluation::MetricName::RocAuc));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod pipeline;
pub mod preprocessing;
pub mod training;

pub use error::{FraudError, Result};

/// Common imports
pub mod prelude {
    pub use crate::data::{DataConfig, DataLoader, RawDataset};
    pub use crate::error::{FraudError, Result};
    pub use crate::evaluation::{Evaluator, MetricName, MetricsReport};
    pub use crate::features::{FeatureSelector, FeatureSet, ScoreMethod, SelectionConfig};
    pub use crate::pipeline::{OutputPaths, Pipeline, PipelineConfig};
    pub use crate::preprocessing::{NumericStatistic, PreprocessingConfig, Preprocessor};
    pub use crate::training::{FamilyGrid, ModelArtifact, ModelTrainer, SearchConfig};
}
