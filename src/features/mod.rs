//! Feature selection module
//!
//! Chooses the model input columns from a clean dataset, either from an
//! explicit allow list or by scoring candidates against the label, and
//! encodes them into an `ndarray` matrix:
//! - Allow-list selection with existence checks
//! - Mutual information, correlation and variance scoring
//! - Ordinal encoding of categorical columns
//! - Stratified hold-out split

mod config;
mod encoder;
mod feature_set;
mod selector;

pub use config::{ScoreMethod, SelectionConfig, SplitConfig};
pub use encoder::{CategoryEncoding, UNKNOWN_CATEGORY};
pub use feature_set::FeatureSet;
pub use selector::FeatureSelector;
