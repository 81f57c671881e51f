//! End-to-end training pipeline
//!
//! Runs Loader, Preprocessor, Feature Selector, hold-out split, Trainer and
//! Evaluator strictly in that order. A failure in any step is reported as a
//! [`PipelineFailure`] naming the step; artifacts are only written once
//! evaluation has succeeded.

mod config;

pub use config::{EvaluationConfig, PipelineConfig};

use crate::data::DataLoader;
use crate::error::FraudError;
use crate::evaluation::{Evaluator, MetricsReport};
use crate::features::FeatureSelector;
use crate::preprocessing::{PreprocessingSummary, Preprocessor};
use crate::training::{ModelTrainer, TrainingOutcome};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Pipeline step, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configure,
    Load,
    Preprocess,
    SelectFeatures,
    Split,
    Train,
    Evaluate,
    WriteArtifacts,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::Load => "load",
            Stage::Preprocess => "preprocess",
            Stage::SelectFeatures => "select-features",
            Stage::Split => "split",
            Stage::Train => "train",
            Stage::Evaluate => "evaluate",
            Stage::WriteArtifacts => "write-artifacts",
        };
        f.write_str(name)
    }
}

/// Stage error tagged with the step that raised it
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub source: FraudError,
}

trait StageExt<T> {
    fn stage(self, stage: Stage) -> std::result::Result<T, PipelineFailure>;
}

impl<T> StageExt<T> for crate::error::Result<T> {
    fn stage(self, stage: Stage) -> std::result::Result<T, PipelineFailure> {
        self.map_err(|source| PipelineFailure { stage, source })
    }
}

/// Where a run writes its results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub model: PathBuf,
    pub metrics_json: PathBuf,
    pub metrics_csv: PathBuf,
}

impl OutputPaths {
    /// Model at `model`; metrics JSON at `metrics` and the CSV next to it
    pub fn new(model: impl Into<PathBuf>, metrics: impl AsRef<Path>) -> Self {
        let metrics = metrics.as_ref();
        let is_csv = metrics.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let (metrics_json, metrics_csv) = if is_csv {
            (metrics.with_extension("json"), metrics.to_path_buf())
        } else {
            (metrics.to_path_buf(), metrics.with_extension("csv"))
        };
        Self {
            model: model.into(),
            metrics_json,
            metrics_csv,
        }
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub preprocessing: PreprocessingSummary,
    pub feature_names: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub training: TrainingOutcome,
    pub metrics: MetricsReport,
    pub elapsed_secs: f64,
}

impl PipelineOutput {
    /// Write model JSON, metrics JSON and metrics CSV. Each file is staged
    /// next to its target and renamed into place once all three are on disk;
    /// on failure nothing from this run is left behind.
    pub fn write(&self, paths: &OutputPaths) -> std::result::Result<(), PipelineFailure> {
        let targets = [&paths.model, &paths.metrics_json, &paths.metrics_csv];
        let staged: Vec<PathBuf> = targets.iter().map(|path| staged_path(path)).collect();

        let written = self
            .training
            .artifact
            .save(&staged[0])
            .and_then(|_| self.metrics.save_json(&staged[1]))
            .and_then(|_| self.metrics.save_csv(&staged[2]));
        if let Err(source) = written {
            discard(&staged);
            return Err(PipelineFailure {
                stage: Stage::WriteArtifacts,
                source,
            });
        }

        for (i, (from, to)) in staged.iter().zip(targets).enumerate() {
            if let Err(e) = std::fs::rename(from, to) {
                discard(&staged);
                discard(&targets[..i]);
                return Err(PipelineFailure {
                    stage: Stage::WriteArtifacts,
                    source: FraudError::from(e),
                });
            }
        }

        info!(
            model = %paths.model.display(),
            metrics = %paths.metrics_json.display(),
            "Artifacts written"
        );
        Ok(())
    }
}

/// `<name>.partial` beside `path`
fn staged_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn discard<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Could not remove partial artifact");
            }
        }
    }
}

/// Linear training pipeline driven by one [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on the file at `data_path`. Writes nothing.
    pub fn run(&self, data_path: impl AsRef<Path>) -> std::result::Result<PipelineOutput, PipelineFailure> {
        let start = Instant::now();
        let config = &self.config;
        config.validate().stage(Stage::Configure)?;

        let raw = DataLoader::new(config.data.clone()).load(data_path).stage(Stage::Load)?;

        let clean = Preprocessor::new(config.preprocessing.clone())
            .run(raw)
            .stage(Stage::Preprocess)?;

        let features = FeatureSelector::new(config.selection.clone())
            .select(&clean)
            .stage(Stage::SelectFeatures)?;

        let (train, test) = features
            .stratified_split(config.split.test_fraction, config.split.seed)
            .stage(Stage::Split)?;
        info!(n_train = train.n_samples(), n_test = test.n_samples(), "Held-out split");

        let training = ModelTrainer::new(config.search.clone())
            .fit(&train)
            .stage(Stage::Train)?;

        let metrics = Evaluator::new(config.evaluation.threshold)
            .evaluate(&training.artifact, &test)
            .stage(Stage::Evaluate)?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(elapsed_secs, "Pipeline complete");

        Ok(PipelineOutput {
            preprocessing: clean.summary().clone(),
            feature_names: features.feature_names().to_vec(),
            n_train: train.n_samples(),
            n_test: test.n_samples(),
            training,
            metrics,
            elapsed_secs,
        })
    }

    /// Run, then write the artifacts
    pub fn run_and_write(
        &self,
        data_path: impl AsRef<Path>,
        paths: &OutputPaths,
    ) -> std::result::Result<PipelineOutput, PipelineFailure> {
        let output = self.run(data_path)?;
        output.write(paths)?;
        Ok(output)
    }
}
