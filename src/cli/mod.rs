//! fraudclf CLI Module
//!
//! Command-line interface for training and inspecting transaction files.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{DataConfig, DataLoader};
use crate::evaluation::MetricName;
use crate::pipeline::{OutputPaths, Pipeline, PipelineConfig, PipelineOutput};
use crate::training::HyperParams;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn err(s: &str) -> ColoredString    { s.truecolor(235, 100, 100) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

/// Closes a pending `step_run` line when the step fails
fn step_check<T, E>(result: Result<T, E>) -> Result<T, E> {
    if result.is_err() {
        println!("{}", err("failed"));
    }
    result
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn row(key: &str, val: impl std::fmt::Display) {
    println!("  {:<20} {}", muted(key), val);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "fraudclf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and evaluate credit-card fraud classifiers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline
    Train {
        /// Transaction file (delimited text)
        #[arg(short, long)]
        data: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Where to write the selected model
        #[arg(long, default_value = "model.json")]
        model_out: PathBuf,

        /// Where to write the metrics report; a CSV table is written beside it
        #[arg(long, default_value = "metrics.json")]
        metrics_out: PathBuf,

        /// Override the configured number of parallel fits
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Show shape, dtypes and missing counts of a data file
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Read delimiter and null tokens from this pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Field delimiter when no configuration is given
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },

    /// Write an editable pipeline configuration
    InitConfig {
        /// Label column of the dataset
        #[arg(short, long)]
        label: String,

        /// Output file
        #[arg(short, long, default_value = "fraudclf.json")]
        output: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    config_path: &Path,
    model_out: &Path,
    metrics_out: &Path,
    jobs: Option<usize>,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Reading configuration");
    let mut config = step_check(PipelineConfig::load(config_path))?;
    if let Some(n_jobs) = jobs {
        config = config.with_n_jobs(n_jobs);
    }
    let total_fits = step_check(config.search.total_fits())?;
    step_done(&format!("{} fold fits on {} workers", total_fits, config.search.n_jobs));

    step_run(&format!("Running pipeline on {}", data_path.display().to_string().cyan()));
    let start = Instant::now();
    let paths = OutputPaths::new(model_out, metrics_out);
    let output = step_check(Pipeline::new(config).run_and_write(data_path, &paths))?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_summary(&output);

    section("Artifacts");
    step_ok(&format!("model    {}", paths.model.display()));
    step_ok(&format!("metrics  {}", paths.metrics_json.display()));
    step_ok(&format!("table    {}", paths.metrics_csv.display()));
    println!();

    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    let prep = &output.preprocessing;
    section("Data");
    row("Rows", format!("{} → {}", prep.rows_in, prep.rows_out));
    row("Duplicates removed", prep.duplicates_removed);
    row("Cells imputed", prep.numeric_cells_filled() + prep.categorical_cells_filled());
    row("Features", output.feature_names.join(", "));
    row("Train / test", format!("{} / {}", output.n_train, output.n_test));

    let report = &output.training.report;
    let best = report.best_candidate();
    section("Search");
    row("Candidates", report.candidates.len());
    row("Fold fits", report.fold_fits);
    let discarded = report.discarded().count();
    if discarded > 0 {
        row("Discarded", discarded.to_string().yellow());
    }
    row("Best family", best.family().to_string().cyan());
    row("Best params", describe_params(&best.params));
    if let Some(cv) = &best.cv {
        row(
            &format!("CV {}", report.objective),
            format!("{:.4} ± {:.4}", cv.mean_score, cv.std_score).white().bold(),
        );
    }

    let metrics = &output.metrics;
    section("Held-out");
    for name in [
        MetricName::RocAuc,
        MetricName::AveragePrecision,
        MetricName::Precision,
        MetricName::Recall,
        MetricName::F1,
    ] {
        if let Some(value) = metrics.get(name) {
            row(name.as_str(), format!("{:.4}", value).white());
        }
    }
    let cm = &metrics.confusion;
    row(
        "Confusion",
        format!(
            "tp {}  fp {}  tn {}  fn {}",
            cm.true_positives, cm.false_positives, cm.true_negatives, cm.false_negatives
        ),
    );
}

fn describe_params(params: &HyperParams) -> String {
    match params {
        HyperParams::GradientBoosting(p) => format!(
            "n_estimators={} learning_rate={} max_depth={} min_samples_leaf={} subsample={}",
            p.n_estimators, p.learning_rate, p.max_depth, p.min_samples_leaf, p.subsample
        ),
        HyperParams::RandomForest(p) => format!(
            "n_estimators={} max_depth={} min_samples_leaf={} max_features={:?}",
            p.n_estimators, p.max_depth, p.min_samples_leaf, p.max_features
        ),
    }
}

pub fn cmd_info(data_path: &Path, config_path: Option<&Path>, delimiter: char) -> anyhow::Result<()> {
    section("Data Info");

    // Describing a file never resolves the schema, so the label is not consulted
    let data_config = match config_path {
        Some(path) => PipelineConfig::load(path)?.data,
        None => DataConfig::csv(String::new()).with_delimiter(delimiter),
    };
    let info = DataLoader::new(data_config).describe(data_path)?;

    row("File", info.path.display());
    row("Size", format!("{:.2} MB", info.file_size as f64 / 1024.0 / 1024.0));
    row("Rows", info.n_rows);
    row("Columns", info.n_cols);
    println!();

    println!("  {:<24} {:<12} {:>8}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(46)));
    for column in &info.columns {
        println!(
            "  {:<24} {:<12} {:>8}",
            column.name,
            column.dtype.truecolor(140, 140, 140),
            column.null_count
        );
    }

    println!();
    Ok(())
}

pub fn cmd_init_config(label: &str, output: &Path) -> anyhow::Result<()> {
    section("Init Config");
    PipelineConfig::template(label).save(output)?;
    step_ok(&format!("wrote {}", output.display()));
    println!("  {}", dim("edit the search grids and selection policy before training"));
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_step_check_passes_error_through() {
        let result: Result<(), String> = step_check(Err("bad".to_string()));
        assert_eq!(result, Err("bad".to_string()));
        assert_eq!(step_check::<_, String>(Ok(3)), Ok(3));
    }

    #[test]
    fn test_train_with_missing_config_fails() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("model.json");
        let metrics = dir.path().join("metrics.json");

        let result = cmd_train(
            &dir.path().join("data.csv"),
            &dir.path().join("absent.json"),
            &model,
            &metrics,
            None,
        );
        assert!(result.is_err());
        assert!(!model.exists());
        assert!(!metrics.exists());
    }

    #[test]
    fn test_train_with_missing_data_fails_after_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("fraudclf.json");
        cmd_init_config("Class", &config_path).unwrap();

        let model = dir.path().join("model.json");
        let result = cmd_train(
            &dir.path().join("absent.csv"),
            &config_path,
            &model,
            &dir.path().join("metrics.json"),
            Some(2),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("load"), "got {}", err);
        assert!(!model.exists());
    }
}
