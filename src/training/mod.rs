//! Model training module
//!
//! Cross-validated grid search over two tree ensembles:
//! - Gradient boosted regression trees on the log-loss gradient
//! - Random forests of bootstrapped Gini trees
//!
//! Every (family, candidate, fold) fit runs as its own task on a dedicated
//! rayon pool and results are reduced in task order, so the selected model
//! does not depend on the number of worker threads.

mod config;
mod model;
mod search;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod random_forest;

pub use config::{
    FamilyGrid, GbGrid, GbParams, HyperParams, MaxFeatures, ModelFamily, RfGrid, RfParams, SearchConfig,
    MAX_TREE_DEPTH,
};
pub use cross_validation::{CVResults, CVSplit, StratifiedKFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::GradientBoostingClassifier;
pub use model::{ModelArtifact, TrainedModel};
pub use random_forest::RandomForestClassifier;
pub use search::{CandidateResult, ModelTrainer, SearchReport, TrainingOutcome, CV_THRESHOLD};

use rand::{RngCore, SeedableRng};
use rand_xoshiro::SplitMix64;

/// Derive an independent seed from a base seed and a task coordinate
pub fn derive_seed(base: u64, parts: &[u64]) -> u64 {
    parts.iter().fold(SplitMix64::seed_from_u64(base).next_u64(), |acc, &part| {
        SplitMix64::seed_from_u64(acc ^ part).next_u64()
    })
}
