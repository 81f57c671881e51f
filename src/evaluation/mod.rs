//! Model evaluation module
//!
//! Threshold-free ranking metrics (ROC AUC, average precision), calibration
//! metrics (log loss, Brier score) and confusion-matrix metrics at a chosen
//! decision threshold.

mod evaluator;
pub mod metrics;

pub use evaluator::{Evaluator, MetricsReport};
pub use metrics::{ConfusionMatrix, MetricName};
