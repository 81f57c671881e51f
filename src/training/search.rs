//! Cross-validated grid search over model families

use super::config::{HyperParams, ModelFamily, SearchConfig};
use super::cross_validation::{CVResults, CVSplit, StratifiedKFold};
use super::derive_seed;
use super::model::{ModelArtifact, TrainedModel};
use crate::error::{FraudError, Result};
use crate::evaluation::MetricName;
use crate::features::FeatureSet;
use chrono::Utc;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Decision threshold for label-based objectives during cross-validation
pub const CV_THRESHOLD: f64 = 0.5;

/// One (family, candidate, fold) unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FoldTask {
    family_index: usize,
    candidate_index: usize,
    fold: usize,
}

/// Cross-validation record of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub family_index: usize,
    pub candidate_index: usize,
    pub params: HyperParams,
    /// Present when every fold produced a finite score
    pub cv: Option<CVResults>,
    /// First fold failure, when the candidate was discarded
    pub failure: Option<String>,
}

impl CandidateResult {
    pub fn family(&self) -> ModelFamily {
        self.params.family()
    }

    pub fn mean_score(&self) -> Option<f64> {
        self.cv.as_ref().map(|cv| cv.mean_score)
    }
}

/// Everything the search tried
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub objective: MetricName,
    pub cv_folds: usize,
    /// Fold fits actually executed
    pub fold_fits: usize,
    pub candidates: Vec<CandidateResult>,
    /// Position of the winner in `candidates`
    pub best: usize,
    pub elapsed_secs: f64,
}

impl SearchReport {
    pub fn best_candidate(&self) -> &CandidateResult {
        &self.candidates[self.best]
    }

    /// Candidates dropped because a fold failed
    pub fn discarded(&self) -> impl Iterator<Item = &CandidateResult> {
        self.candidates.iter().filter(|c| c.cv.is_none())
    }
}

/// Result of [`ModelTrainer::fit`]
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: SearchReport,
}

/// Grid search with stratified k-fold cross-validation
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    config: SearchConfig,
}

impl ModelTrainer {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the search on the training partition and refit the winner on all of it
    pub fn fit(&self, data: &FeatureSet) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        let (negatives, positives) = data.class_counts();
        let minority = negatives.min(positives);
        if minority < config.cv_folds {
            return Err(FraudError::Config(format!(
                "cv_folds = {} exceeds the minority class size {} of the training partition",
                config.cv_folds, minority
            )));
        }

        let splits = StratifiedKFold::new(config.cv_folds, config.seed).split(data.y())?;

        let candidates: Vec<(usize, usize, HyperParams)> = config
            .families
            .iter()
            .enumerate()
            .flat_map(|(fi, grid)| {
                grid.expand()
                    .into_iter()
                    .enumerate()
                    .map(move |(ci, params)| (fi, ci, params))
            })
            .collect();

        let tasks: Vec<(FoldTask, &HyperParams)> = candidates
            .iter()
            .flat_map(|(fi, ci, params)| {
                (0..config.cv_folds).map(move |fold| {
                    (
                        FoldTask {
                            family_index: *fi,
                            candidate_index: *ci,
                            fold,
                        },
                        params,
                    )
                })
            })
            .collect();

        info!(
            families = config.families.len(),
            candidates = candidates.len(),
            fold_fits = tasks.len(),
            n_jobs = config.n_jobs,
            objective = %config.objective,
            "Starting grid search"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.n_jobs)
            .build()
            .map_err(|e| FraudError::Training(format!("failed to build worker pool: {}", e)))?;

        let mut fold_results: Vec<(FoldTask, std::result::Result<f64, String>)> = pool.install(|| {
            tasks
                .par_iter()
                .map(|(task, params)| {
                    let seed = derive_seed(
                        config.seed,
                        &[task.family_index as u64, task.candidate_index as u64, task.fold as u64],
                    );
                    let score = run_fold(params, data.x(), data.y(), &splits[task.fold], config.objective, seed);
                    (*task, score)
                })
                .collect()
        });
        fold_results.sort_by_key(|(task, _)| *task);

        let fold_fits = fold_results.len();
        let mut results = Vec::with_capacity(candidates.len());

        for ((fi, ci, params), chunk) in candidates.into_iter().zip(fold_results.chunks(config.cv_folds)) {
            let mut scores = Vec::with_capacity(config.cv_folds);
            let mut failure = None;
            for (task, outcome) in chunk {
                match outcome {
                    Ok(score) => scores.push(*score),
                    Err(reason) => {
                        failure = Some(format!("fold {}: {}", task.fold, reason));
                        break;
                    }
                }
            }

            let cv = match &failure {
                None => Some(CVResults::from_scores(scores)),
                Some(reason) => {
                    warn!(family = %params.family(), candidate = ci, %reason, "Discarding candidate");
                    None
                }
            };
            if let Some(cv) = &cv {
                debug!(
                    family = %params.family(),
                    candidate = ci,
                    mean = cv.mean_score,
                    std = cv.std_score,
                    "Candidate scored"
                );
            }

            results.push(CandidateResult {
                family_index: fi,
                candidate_index: ci,
                params,
                cv,
                failure,
            });
        }

        for (fi, grid) in config.families.iter().enumerate() {
            let any_survived = results.iter().any(|r| r.family_index == fi && r.cv.is_some());
            if !any_survived {
                return Err(FraudError::Training(format!(
                    "every {} candidate failed to fit (family #{})",
                    grid.family(),
                    fi
                )));
            }
        }

        let best = select_best(&results, config.objective).ok_or_else(|| {
            FraudError::Training("no candidate produced a usable score".to_string())
        })?;
        let winner = &results[best];
        let cv = winner
            .cv
            .clone()
            .ok_or_else(|| FraudError::Training("selected candidate has no cross-validation score".to_string()))?;

        info!(
            family = %winner.family(),
            candidate = winner.candidate_index,
            cv_score = cv.mean_score,
            "Selected best candidate; refitting on the full training partition"
        );

        let model = pool.install(|| TrainedModel::fit(&winner.params, data.x(), data.y(), config.seed))?;

        let artifact = ModelArtifact {
            family: winner.family(),
            params: winner.params.clone(),
            objective: config.objective,
            cv_score: cv.mean_score,
            cv_std: cv.std_score,
            feature_names: data.feature_names().to_vec(),
            label: data.label().to_string(),
            encodings: data.encodings().to_vec(),
            seed: config.seed,
            n_training_samples: data.n_samples(),
            trained_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model,
        };

        let report = SearchReport {
            objective: config.objective,
            cv_folds: config.cv_folds,
            fold_fits,
            candidates: results,
            best,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            fold_fits,
            discarded = report.discarded().count(),
            elapsed_secs = report.elapsed_secs,
            "Grid search complete"
        );

        Ok(TrainingOutcome { artifact, report })
    }
}

/// Fit on the training folds and score the held-out fold.
/// Errors and non-finite outputs count as a failed fit.
fn run_fold(
    params: &HyperParams,
    x: &Array2<f64>,
    y: &Array1<f64>,
    split: &CVSplit,
    objective: MetricName,
    seed: u64,
) -> std::result::Result<f64, String> {
    let x_train = x.select(Axis(0), &split.train_indices);
    let y_train = y.select(Axis(0), &split.train_indices);
    let x_test = x.select(Axis(0), &split.test_indices);
    let y_test = y.select(Axis(0), &split.test_indices);

    let model = TrainedModel::fit(params, &x_train, &y_train, seed).map_err(|e| e.to_string())?;
    let proba = model.predict_proba(&x_test).map_err(|e| e.to_string())?;

    if proba.iter().any(|p| !p.is_finite()) {
        return Err("non-finite predicted probability".to_string());
    }

    let score = objective.compute(y_test.view(), proba.view(), CV_THRESHOLD);
    if !score.is_finite() {
        return Err(format!("non-finite {} score", objective));
    }
    Ok(score)
}

/// Index of the best surviving candidate. Candidates are in declaration
/// order, so keeping the first of equal scores breaks ties by family and
/// then grid position.
fn select_best(results: &[CandidateResult], objective: MetricName) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, result) in results.iter().enumerate() {
        let Some(score) = result.mean_score() else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, current)) if objective.greater_is_better() => score > current,
            Some((_, current)) => score < current,
        };
        if better {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}
