use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fraudclf::evaluation::MetricName;
use fraudclf::features::FeatureSet;
use fraudclf::training::{FamilyGrid, GbGrid, MaxFeatures, ModelTrainer, RfGrid, SearchConfig};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Imbalanced synthetic transactions, about 5% fraud
fn create_transactions(n_rows: usize, n_features: usize) -> FeatureSet {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let y = Array1::from_iter((0..n_rows).map(|_| if rng.gen::<f64>() < 0.05 { 1.0 } else { 0.0 }));
    let x = Array2::from_shape_fn((n_rows, n_features), |(i, j)| {
        let shift = if j < 3 && y[i] == 1.0 { 2.0 } else { 0.0 };
        rng.gen::<f64>() * 3.0 + shift
    });
    let names = (0..n_features).map(|j| format!("v{}", j)).collect();
    FeatureSet::new(names, "Class", x, y, Vec::new()).unwrap()
}

fn search_config(n_jobs: usize) -> SearchConfig {
    SearchConfig::new(MetricName::AveragePrecision, 3, 7)
        .with_family(FamilyGrid::GradientBoosting(GbGrid {
            n_estimators: vec![20],
            learning_rate: vec![0.1],
            max_depth: vec![3],
            min_samples_leaf: vec![5],
            subsample: vec![0.8],
        }))
        .with_family(FamilyGrid::RandomForest(RfGrid {
            n_estimators: vec![20],
            max_depth: vec![6],
            min_samples_leaf: vec![2],
            max_features: vec![MaxFeatures::Sqrt],
        }))
        .with_n_jobs(n_jobs)
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for n_rows in [1000, 5000].iter() {
        let data = create_transactions(*n_rows, 10);

        for n_jobs in [1, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("fit_jobs{}", n_jobs), n_rows),
                &data,
                |b, data| {
                    let trainer = ModelTrainer::new(search_config(n_jobs));
                    b.iter(|| trainer.fit(black_box(data)).unwrap())
                },
            );
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let outcome = ModelTrainer::new(search_config(4))
        .fit(&create_transactions(5000, 10))
        .unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let data = create_transactions(*n_rows, 10);

        group.bench_with_input(BenchmarkId::new("predict_proba", n_rows), data.x(), |b, x| {
            b.iter(|| outcome.artifact.predict_proba(black_box(x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_search, bench_prediction);
criterion_main!(benches);
