//! Hyperparameter grids and search configuration

use crate::error::{FraudError, Result};
use crate::evaluation::MetricName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest tree whose JSON stays within serde_json's nesting limit
pub const MAX_TREE_DEPTH: usize = 48;

/// Model family searched by the trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    GradientBoosting,
    RandomForest,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::GradientBoosting => write!(f, "gradient_boosting"),
            ModelFamily::RandomForest => write!(f, "random_forest"),
        }
    }
}

/// Features considered at each forest split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count in `1..=n_features`
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features.max(1))
    }

    fn validate(&self) -> Result<()> {
        match *self {
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => Err(FraudError::Config(format!(
                "max_features fraction must be in (0, 1], got {}",
                f
            ))),
            MaxFeatures::Fixed(0) => Err(FraudError::Config("max_features must be at least 1".to_string())),
            _ => Ok(()),
        }
    }
}

/// One gradient boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub subsample: f64,
}

/// One random forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

/// Concrete hyperparameters of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum HyperParams {
    GradientBoosting(GbParams),
    RandomForest(RfParams),
}

impl HyperParams {
    pub fn family(&self) -> ModelFamily {
        match self {
            HyperParams::GradientBoosting(_) => ModelFamily::GradientBoosting,
            HyperParams::RandomForest(_) => ModelFamily::RandomForest,
        }
    }
}

/// Candidate values for gradient boosting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbGrid {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
    pub subsample: Vec<f64>,
}

/// Candidate values for random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
    pub max_features: Vec<MaxFeatures>,
}

/// Search space of one model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FamilyGrid {
    GradientBoosting(GbGrid),
    RandomForest(RfGrid),
}

fn non_empty<T>(family: ModelFamily, name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(FraudError::Config(format!(
            "{} grid parameter '{}' has no values",
            family, name
        )));
    }
    Ok(())
}

fn depth_in_range(family: ModelFamily, values: &[usize]) -> Result<()> {
    all_at_least_one(family, "max_depth", values)?;
    if let Some(depth) = values.iter().find(|d| **d > MAX_TREE_DEPTH) {
        return Err(FraudError::Config(format!(
            "{} max_depth {} exceeds the limit of {}",
            family, depth, MAX_TREE_DEPTH
        )));
    }
    Ok(())
}

fn all_at_least_one(family: ModelFamily, name: &str, values: &[usize]) -> Result<()> {
    non_empty(family, name, values)?;
    if values.contains(&0) {
        return Err(FraudError::Config(format!(
            "{} grid parameter '{}' must be at least 1",
            family, name
        )));
    }
    Ok(())
}

impl FamilyGrid {
    pub fn family(&self) -> ModelFamily {
        match self {
            FamilyGrid::GradientBoosting(_) => ModelFamily::GradientBoosting,
            FamilyGrid::RandomForest(_) => ModelFamily::RandomForest,
        }
    }

    /// Number of candidates in the cartesian product
    pub fn len(&self) -> usize {
        match self {
            FamilyGrid::GradientBoosting(g) => {
                g.n_estimators.len()
                    * g.learning_rate.len()
                    * g.max_depth.len()
                    * g.min_samples_leaf.len()
                    * g.subsample.len()
            }
            FamilyGrid::RandomForest(g) => {
                g.n_estimators.len() * g.max_depth.len() * g.min_samples_leaf.len() * g.max_features.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every parameter list is non-empty and every value is usable
    pub fn validate(&self) -> Result<()> {
        let family = self.family();
        match self {
            FamilyGrid::GradientBoosting(g) => {
                all_at_least_one(family, "n_estimators", &g.n_estimators)?;
                non_empty(family, "learning_rate", &g.learning_rate)?;
                if let Some(lr) = g.learning_rate.iter().find(|lr| !(lr.is_finite() && **lr > 0.0)) {
                    return Err(FraudError::Config(format!(
                        "learning_rate must be positive and finite, got {}",
                        lr
                    )));
                }
                depth_in_range(family, &g.max_depth)?;
                all_at_least_one(family, "min_samples_leaf", &g.min_samples_leaf)?;
                non_empty(family, "subsample", &g.subsample)?;
                if let Some(s) = g.subsample.iter().find(|s| !(**s > 0.0 && **s <= 1.0)) {
                    return Err(FraudError::Config(format!(
                        "subsample must be in (0, 1], got {}",
                        s
                    )));
                }
            }
            FamilyGrid::RandomForest(g) => {
                all_at_least_one(family, "n_estimators", &g.n_estimators)?;
                depth_in_range(family, &g.max_depth)?;
                all_at_least_one(family, "min_samples_leaf", &g.min_samples_leaf)?;
                non_empty(family, "max_features", &g.max_features)?;
                for mf in &g.max_features {
                    mf.validate()?;
                }
            }
        }
        Ok(())
    }

    /// Expand to the cartesian product in declared order, last parameter fastest
    pub fn expand(&self) -> Vec<HyperParams> {
        let mut out = Vec::with_capacity(self.len());
        match self {
            FamilyGrid::GradientBoosting(g) => {
                for &n_estimators in &g.n_estimators {
                    for &learning_rate in &g.learning_rate {
                        for &max_depth in &g.max_depth {
                            for &min_samples_leaf in &g.min_samples_leaf {
                                for &subsample in &g.subsample {
                                    out.push(HyperParams::GradientBoosting(GbParams {
                                        n_estimators,
                                        learning_rate,
                                        max_depth,
                                        min_samples_leaf,
                                        subsample,
                                    }));
                                }
                            }
                        }
                    }
                }
            }
            FamilyGrid::RandomForest(g) => {
                for &n_estimators in &g.n_estimators {
                    for &max_depth in &g.max_depth {
                        for &min_samples_leaf in &g.min_samples_leaf {
                            for &max_features in &g.max_features {
                                out.push(HyperParams::RandomForest(RfParams {
                                    n_estimators,
                                    max_depth,
                                    min_samples_leaf,
                                    max_features,
                                }));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// Cross-validated grid search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Families in declaration order; earlier wins ties
    pub families: Vec<FamilyGrid>,
    /// Number of stratified folds
    pub cv_folds: usize,
    /// Metric maximised (or minimised for losses) across folds
    pub objective: MetricName,
    /// Base seed for folds and model randomness
    pub seed: u64,
    /// Worker threads
    pub n_jobs: usize,
    /// Upper bound on total fold fits
    pub max_fits: usize,
}

impl SearchConfig {
    pub fn new(objective: MetricName, cv_folds: usize, seed: u64) -> Self {
        Self {
            families: Vec::new(),
            cv_folds,
            objective,
            seed,
            n_jobs: 1,
            max_fits: 10_000,
        }
    }

    /// Builder method to append a family grid
    pub fn with_family(mut self, grid: FamilyGrid) -> Self {
        self.families.push(grid);
        self
    }

    /// Builder method to set the worker count
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Builder method to set the fit bound
    pub fn with_max_fits(mut self, max_fits: usize) -> Self {
        self.max_fits = max_fits;
        self
    }

    /// Total fold fits: sum of grid sizes times folds
    pub fn total_fits(&self) -> Result<usize> {
        self.families
            .iter()
            .try_fold(0usize, |acc, grid| acc.checked_add(grid.len()))
            .and_then(|candidates| candidates.checked_mul(self.cv_folds))
            .ok_or_else(|| {
                FraudError::Config(format!(
                    "fold fit count overflows with {} folds",
                    self.cv_folds
                ))
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.families.is_empty() {
            return Err(FraudError::Config("search declares no model families".to_string()));
        }
        if self.cv_folds < 2 {
            return Err(FraudError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.n_jobs == 0 {
            return Err(FraudError::Config("n_jobs must be at least 1".to_string()));
        }
        for grid in &self.families {
            grid.validate()?;
        }
        let total = self.total_fits()?;
        if total > self.max_fits {
            return Err(FraudError::Config(format!(
                "search needs {} fold fits, above max_fits = {}",
                total, self.max_fits
            )));
        }
        Ok(())
    }
}
