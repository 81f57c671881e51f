//! Integration test: Full pipeline (load → clean → select → split → search → evaluate → write)

use fraudclf::evaluation::{Evaluator, MetricName, MetricsReport};
use fraudclf::features::FeatureSet;
use fraudclf::features::SelectionConfig;
use fraudclf::pipeline::{OutputPaths, Pipeline, PipelineConfig, Stage};
use fraudclf::preprocessing::NumericStatistic;
use fraudclf::training::{FamilyGrid, GbGrid, MaxFeatures, ModelArtifact, RfGrid, SearchConfig};
use fraudclf::FraudError;
use ndarray::{Array1, Array2};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const MERCHANTS: [&str; 3] = ["grocery", "travel", "online"];
const DUPLICATED: [usize; 5] = [1, 2, 3, 4, 6];
const V1_MISSING: [usize; 3] = [11, 22, 33];
const V2_MISSING: [usize; 3] = [14, 17, 18];

struct Row {
    step: usize,
    v1: Option<f64>,
    v2: Option<f64>,
    merchant: &'static str,
    class: u8,
}

/// 95 distinct rows, 19 of them fraud
fn unique_rows() -> Vec<Row> {
    (0..95)
        .map(|i| {
            let fraud = i % 5 == 0;
            let v1 = if fraud { 5.0 + (i % 7) as f64 } else { (i % 11) as f64 * 0.3 };
            let v2 = ((i * 13) % 17) as f64;
            Row {
                step: i,
                v1: (!V1_MISSING.contains(&i)).then_some(v1),
                v2: (!V2_MISSING.contains(&i)).then_some(v2),
                merchant: MERCHANTS[i % 3],
                class: fraud as u8,
            }
        })
        .collect()
}

fn fmt_cell(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// 100 rows: the 95 distinct rows plus 5 exact repeats
fn write_transactions() -> NamedTempFile {
    let rows = unique_rows();
    let mut text = String::from("step,v1,v2,merchant,Class\n");
    let lines = rows.iter().chain(DUPLICATED.iter().map(|&i| &rows[i]));
    for row in lines {
        text.push_str(&format!(
            "{},{},{},{},{}\n",
            row.step,
            fmt_cell(row.v1),
            fmt_cell(row.v2),
            row.merchant,
            row.class
        ));
    }

    let mut tmp = NamedTempFile::with_suffix(".csv").unwrap();
    tmp.write_all(text.as_bytes()).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::template("Class");
    config.preprocessing.numeric_statistic = NumericStatistic::Median;
    config.selection = SelectionConfig::allow_list(["v1", "v2", "merchant"]);
    config.search = SearchConfig::new(MetricName::RocAuc, 3, 7)
        .with_family(FamilyGrid::GradientBoosting(GbGrid {
            n_estimators: vec![10],
            learning_rate: vec![0.1, 0.3],
            max_depth: vec![2],
            min_samples_leaf: vec![2],
            subsample: vec![0.8],
        }))
        .with_family(FamilyGrid::RandomForest(RfGrid {
            n_estimators: vec![10],
            max_depth: vec![4],
            min_samples_leaf: vec![1],
            max_features: vec![MaxFeatures::Sqrt],
        }))
        .with_n_jobs(2);
    config
}

#[test]
fn test_pipeline_cleans_and_trains() {
    let data = write_transactions();
    let output = Pipeline::new(config()).run(data.path()).unwrap();

    let prep = &output.preprocessing;
    assert_eq!(prep.rows_in, 100);
    assert_eq!(prep.rows_out, 95);
    assert_eq!(prep.duplicates_removed, 5);

    let rows = unique_rows();
    let v1_median = median(rows.iter().filter_map(|r| r.v1).collect());
    let v2_median = median(rows.iter().filter_map(|r| r.v2).collect());

    let v1 = prep.numeric.iter().find(|n| n.column == "v1").unwrap();
    assert_eq!(v1.filled, 3);
    assert_eq!(v1.fill_value, v1_median);
    let v2 = prep.numeric.iter().find(|n| n.column == "v2").unwrap();
    assert_eq!(v2.filled, 3);
    assert_eq!(v2.fill_value, v2_median);

    assert_eq!(output.feature_names, vec!["v1", "v2", "merchant"]);
    assert_eq!(output.n_train + output.n_test, 95);
    assert_eq!(output.training.report.fold_fits, 9);

    let metrics = &output.metrics;
    assert_eq!(metrics.n_samples, output.n_test);
    assert!(metrics.n_positives > 0);
    assert_eq!(metrics.metrics.len(), MetricName::ALL.len());
    assert!(metrics.get(MetricName::RocAuc).unwrap() > 0.8);
}

#[test]
fn test_pipeline_writes_artifacts() {
    let data = write_transactions();
    let dir = TempDir::new().unwrap();
    let paths = OutputPaths::new(dir.path().join("model.json"), dir.path().join("metrics.json"));

    let output = Pipeline::new(config()).run_and_write(data.path(), &paths).unwrap();

    let artifact = ModelArtifact::load(&paths.model).unwrap();
    assert_eq!(artifact.params, output.training.artifact.params);
    assert_eq!(artifact.feature_names, vec!["v1", "v2", "merchant"]);
    assert_eq!(artifact.encodings.len(), 1);
    assert_eq!(artifact.label, "Class");

    let report: MetricsReport =
        serde_json::from_str(&std::fs::read_to_string(&paths.metrics_json).unwrap()).unwrap();
    assert_eq!(report.confusion, output.metrics.confusion);

    let table = std::fs::read_to_string(&paths.metrics_csv).unwrap();
    assert!(table.starts_with("metric,value"));
    assert!(table.contains("average_precision,"));
}

#[test]
fn test_failed_write_leaves_no_artifacts() {
    let data = write_transactions();
    let dir = TempDir::new().unwrap();
    // Metrics go to a directory that does not exist, after the model is staged
    let paths = OutputPaths::new(
        dir.path().join("model.json"),
        dir.path().join("missing").join("metrics.json"),
    );

    let failure = Pipeline::new(config()).run_and_write(data.path(), &paths).unwrap_err();

    assert_eq!(failure.stage, Stage::WriteArtifacts);
    assert!(matches!(failure.source, FraudError::Io(_)), "got {:?}", failure.source);
    assert!(!paths.model.exists());
    assert!(!dir.path().join("model.json.partial").exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_single_fraud_row_fails_in_training() {
    // One fraud row stays on the training side, leaving fewer positives than folds
    let mut text = String::from("v1,Class\n");
    for i in 0..30 {
        text.push_str(&format!("{},{}\n", i, u8::from(i == 0)));
    }
    let mut data = NamedTempFile::with_suffix(".csv").unwrap();
    data.write_all(text.as_bytes()).unwrap();
    data.flush().unwrap();

    let mut config = config();
    config.selection = SelectionConfig::allow_list(["v1"]);
    config.search = SearchConfig::new(MetricName::RocAuc, 2, 0).with_family(FamilyGrid::RandomForest(RfGrid {
        n_estimators: vec![3],
        max_depth: vec![2],
        min_samples_leaf: vec![1],
        max_features: vec![MaxFeatures::All],
    }));

    let dir = TempDir::new().unwrap();
    let paths = OutputPaths::new(dir.path().join("model.json"), dir.path().join("metrics.json"));
    let failure = Pipeline::new(config).run_and_write(data.path(), &paths).unwrap_err();

    assert_eq!(failure.stage, Stage::Train);
    assert!(matches!(failure.source, FraudError::Config(_)));
    assert!(!paths.model.exists());
    assert!(!paths.metrics_json.exists());
}

#[test]
fn test_single_class_holdout_is_evaluation_error() {
    let data = write_transactions();
    let output = Pipeline::new(config()).run(data.path()).unwrap();
    let artifact = &output.training.artifact;

    let n = 10;
    let x = Array2::from_shape_fn((n, 3), |(i, j)| (i + j) as f64);
    let all_legit = FeatureSet::new(artifact.feature_names.clone(), "Class", x, Array1::zeros(n), Vec::new()).unwrap();

    let err = Evaluator::new(0.5).evaluate(artifact, &all_legit).unwrap_err();
    assert!(matches!(err, FraudError::Evaluation(_)), "got {:?}", err);
}

#[test]
fn test_unknown_feature_fails_before_training() {
    let data = write_transactions();
    let mut config = config();
    config.selection = SelectionConfig::allow_list(["v1", "amount"]);

    let failure = Pipeline::new(config).run(data.path()).unwrap_err();
    assert_eq!(failure.stage, Stage::SelectFeatures);
    assert!(failure.to_string().contains("'amount'"));
}

#[test]
fn test_config_file_round_trip() {
    let tmp = NamedTempFile::with_suffix(".json").unwrap();
    config().save(tmp.path()).unwrap();
    let loaded = PipelineConfig::load(tmp.path()).unwrap();
    assert_eq!(loaded.search, config().search);
    assert_eq!(loaded.selection, config().selection);
}
