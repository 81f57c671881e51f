//! Integration test: cross-validated grid search

use fraudclf::evaluation::MetricName;
use fraudclf::features::FeatureSet;
use fraudclf::training::{
    FamilyGrid, GbGrid, HyperParams, MaxFeatures, ModelArtifact, ModelFamily, ModelTrainer, RfGrid,
    SearchConfig,
};
use fraudclf::FraudError;
use ndarray::{Array1, Array2};
use tempfile::NamedTempFile;

/// 100 rows, 20 positives; feature 0 separates the classes with some overlap
fn transactions() -> FeatureSet {
    let n = 100;
    let y = Array1::from_iter((0..n).map(|i| if i % 5 == 0 { 1.0 } else { 0.0 }));
    let x = Array2::from_shape_fn((n, 3), |(i, j)| {
        let fraud = i % 5 == 0;
        match j {
            0 => (if fraud { 3.0 } else { 0.0 }) + ((i * 7) % 10) as f64 * 0.4,
            1 => ((i * 13) % 17) as f64,
            _ => (i % 2) as f64,
        }
    });
    FeatureSet::new(
        vec!["amount".into(), "hour".into(), "channel".into()],
        "Class",
        x,
        y,
        Vec::new(),
    )
    .unwrap()
}

fn gb_grid(n_estimators: Vec<usize>) -> FamilyGrid {
    FamilyGrid::GradientBoosting(GbGrid {
        n_estimators,
        learning_rate: vec![0.1],
        max_depth: vec![2],
        min_samples_leaf: vec![2],
        subsample: vec![1.0],
    })
}

fn rf_grid(max_depth: Vec<usize>, min_samples_leaf: Vec<usize>) -> FamilyGrid {
    FamilyGrid::RandomForest(RfGrid {
        n_estimators: vec![8],
        max_depth,
        min_samples_leaf,
        max_features: vec![MaxFeatures::Sqrt],
    })
}

#[test]
fn test_fold_fit_count() {
    // 3 boosting candidates and 4 forest candidates over 5 folds
    let config = SearchConfig::new(MetricName::RocAuc, 5, 11)
        .with_family(gb_grid(vec![5, 10, 15]))
        .with_family(rf_grid(vec![3, 5], vec![1, 2]));
    assert_eq!(config.total_fits().unwrap(), 35);

    let outcome = ModelTrainer::new(config).fit(&transactions()).unwrap();
    let report = &outcome.report;

    assert_eq!(report.fold_fits, 35);
    assert_eq!(report.candidates.len(), 7);
    assert!(report.candidates.iter().all(|c| c.cv.as_ref().map(|cv| cv.n_folds) == Some(5)));
    assert_eq!(report.discarded().count(), 0);
}

#[test]
fn test_winner_has_best_mean_score() {
    let config = SearchConfig::new(MetricName::AveragePrecision, 4, 3)
        .with_family(gb_grid(vec![5, 20]))
        .with_family(rf_grid(vec![2, 6], vec![1]));
    let outcome = ModelTrainer::new(config).fit(&transactions()).unwrap();
    let report = &outcome.report;

    let best_score = report.best_candidate().mean_score().unwrap();
    for candidate in &report.candidates {
        assert!(candidate.mean_score().unwrap() <= best_score);
    }

    let artifact = &outcome.artifact;
    assert_eq!(artifact.params, report.best_candidate().params);
    assert_eq!(artifact.cv_score, best_score);
    assert_eq!(artifact.n_training_samples, 100);
    assert_eq!(artifact.objective, MetricName::AveragePrecision);
}

#[test]
fn test_tie_keeps_first_declared_candidate() {
    // Deterministic boosting with identical parameters scores identically
    let config = SearchConfig::new(MetricName::RocAuc, 5, 1).with_family(gb_grid(vec![10, 10, 10]));
    let outcome = ModelTrainer::new(config).fit(&transactions()).unwrap();
    let report = &outcome.report;

    let scores: Vec<f64> = report.candidates.iter().map(|c| c.mean_score().unwrap()).collect();
    assert_eq!(scores[0], scores[1]);
    assert_eq!(scores[1], scores[2]);
    assert_eq!(report.best_candidate().candidate_index, 0);
}

#[test]
fn test_lower_is_better_objective() {
    let config = SearchConfig::new(MetricName::LogLoss, 5, 9)
        .with_family(gb_grid(vec![1, 30]))
        .with_family(rf_grid(vec![4], vec![2]));
    let outcome = ModelTrainer::new(config).fit(&transactions()).unwrap();
    let report = &outcome.report;

    let best_score = report.best_candidate().mean_score().unwrap();
    for candidate in &report.candidates {
        assert!(candidate.mean_score().unwrap() >= best_score);
    }
}

#[test]
fn test_result_independent_of_worker_count() {
    let base = SearchConfig::new(MetricName::RocAuc, 5, 2024)
        .with_family(gb_grid(vec![5, 10]))
        .with_family(rf_grid(vec![3, 6], vec![1, 3]));

    let serial = ModelTrainer::new(base.clone().with_n_jobs(1)).fit(&transactions()).unwrap();
    let parallel = ModelTrainer::new(base.with_n_jobs(4)).fit(&transactions()).unwrap();

    assert_eq!(serial.artifact.params, parallel.artifact.params);
    assert_eq!(serial.artifact.cv_score, parallel.artifact.cv_score);
    let serial_scores: Vec<Option<f64>> = serial.report.candidates.iter().map(|c| c.mean_score()).collect();
    let parallel_scores: Vec<Option<f64>> = parallel.report.candidates.iter().map(|c| c.mean_score()).collect();
    assert_eq!(serial_scores, parallel_scores);

    let x = transactions().x().clone();
    assert_eq!(
        serial.artifact.predict_proba(&x).unwrap(),
        parallel.artifact.predict_proba(&x).unwrap()
    );
}

#[test]
fn test_folds_exceeding_minority_class() {
    let config = SearchConfig::new(MetricName::RocAuc, 25, 0).with_family(gb_grid(vec![5]));
    let err = ModelTrainer::new(config).fit(&transactions()).unwrap_err();
    assert!(matches!(err, FraudError::Config(_)), "got {:?}", err);
}

#[test]
fn test_too_many_fits() {
    let config = SearchConfig::new(MetricName::RocAuc, 5, 0)
        .with_family(gb_grid(vec![1, 2, 3, 4]))
        .with_max_fits(10);
    let err = ModelTrainer::new(config).fit(&transactions()).unwrap_err();
    assert!(matches!(err, FraudError::Config(_)), "got {:?}", err);
}

#[test]
fn test_every_candidate_failing_is_training_error() {
    let data = transactions();
    let mut x = data.x().clone();
    x.column_mut(0).fill(f64::NAN);
    let broken = FeatureSet::new(
        data.feature_names().to_vec(),
        "Class",
        x,
        data.y().clone(),
        Vec::new(),
    )
    .unwrap();

    let config = SearchConfig::new(MetricName::RocAuc, 5, 0)
        .with_family(gb_grid(vec![5]))
        .with_family(rf_grid(vec![3], vec![1]));
    let err = ModelTrainer::new(config).fit(&broken).unwrap_err();
    assert!(matches!(err, FraudError::Training(_)), "got {:?}", err);
}

/// One feature taking four values; the middle groups mix both classes
fn grouped_transactions() -> FeatureSet {
    let groups = [(30, 15), (20, 20), (30, 7), (30, 7)];
    let mut x = Vec::new();
    let mut y = Vec::new();
    for (g, &(size, positives)) in groups.iter().enumerate() {
        for k in 0..size {
            x.push(g as f64);
            y.push(if k < positives { 1.0 } else { 0.0 });
        }
    }
    let n = y.len();
    FeatureSet::new(
        vec!["merchant_group".into()],
        "Class",
        Array2::from_shape_vec((n, 1), x).unwrap(),
        Array1::from(y),
        Vec::new(),
    )
    .unwrap()
}

#[test]
fn test_one_family_failing_everywhere_is_training_error() {
    // A learning rate at the edge of f64 drives the boosted log-odds to infinity
    let diverging = FamilyGrid::GradientBoosting(GbGrid {
        n_estimators: vec![20],
        learning_rate: vec![f64::MAX],
        max_depth: vec![1],
        min_samples_leaf: vec![1],
        subsample: vec![1.0],
    });
    let data = grouped_transactions();

    let forest_only = SearchConfig::new(MetricName::RocAuc, 5, 4).with_family(rf_grid(vec![2], vec![1]));
    assert!(ModelTrainer::new(forest_only).fit(&data).is_ok());

    let config = SearchConfig::new(MetricName::RocAuc, 5, 4)
        .with_family(diverging)
        .with_family(rf_grid(vec![2], vec![1]));
    assert!(config.validate().is_ok());

    let err = ModelTrainer::new(config).fit(&data).unwrap_err();
    assert!(matches!(err, FraudError::Training(_)), "got {:?}", err);
    assert!(err.to_string().contains("gradient_boosting"), "got {}", err);
}

/// Negatives below 80, positives above 1000; any split in the gap is perfect
fn separable_transactions() -> FeatureSet {
    let n = 100;
    let y = Array1::from_iter((0..n).map(|i| if i >= 80 { 1.0 } else { 0.0 }));
    let x = Array2::from_shape_fn((n, 1), |(i, _)| if i >= 80 { 1000.0 + i as f64 } else { i as f64 });
    FeatureSet::new(vec!["amount".into()], "Class", x, y, Vec::new()).unwrap()
}

#[test]
fn test_tie_across_families_keeps_first_declared_family() {
    let data = separable_transactions();
    let boosting = || gb_grid(vec![5]);
    let forest = || rf_grid(vec![3], vec![1]);

    let config = SearchConfig::new(MetricName::RocAuc, 5, 8)
        .with_family(boosting())
        .with_family(forest());
    let outcome = ModelTrainer::new(config).fit(&data).unwrap();
    let scores: Vec<f64> = outcome.report.candidates.iter().map(|c| c.mean_score().unwrap()).collect();
    assert_eq!(scores, vec![1.0, 1.0]);
    assert_eq!(outcome.report.best_candidate().family_index, 0);
    assert_eq!(outcome.artifact.family, ModelFamily::GradientBoosting);

    let reversed = SearchConfig::new(MetricName::RocAuc, 5, 8)
        .with_family(forest())
        .with_family(boosting());
    let outcome = ModelTrainer::new(reversed).fit(&data).unwrap();
    assert_eq!(outcome.report.best_candidate().family_index, 0);
    assert_eq!(outcome.artifact.family, ModelFamily::RandomForest);
}

#[test]
fn test_artifact_round_trip() {
    let config = SearchConfig::new(MetricName::F1, 5, 5).with_family(rf_grid(vec![4], vec![1]));
    let outcome = ModelTrainer::new(config).fit(&transactions()).unwrap();

    let tmp = NamedTempFile::with_suffix(".json").unwrap();
    outcome.artifact.save(tmp.path()).unwrap();
    let loaded = ModelArtifact::load(tmp.path()).unwrap();

    assert_eq!(loaded.family, ModelFamily::RandomForest);
    assert!(matches!(loaded.params, HyperParams::RandomForest(_)));
    assert_eq!(loaded.feature_names, outcome.artifact.feature_names);

    let x = transactions().x().clone();
    assert_eq!(
        loaded.predict_proba(&x).unwrap(),
        outcome.artifact.predict_proba(&x).unwrap()
    );
}
