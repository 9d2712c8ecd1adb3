//! Training and scoring benchmarks.
//!
//! Run with: cargo bench --bench train_score

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use retention_risk::model::BoostingConfig;
use retention_risk::testing::synthetic_population;
use retention_risk::training::Verbosity;
use retention_risk::{EmployeeSnapshot, RetentionTrainer, ScoringRecord};

fn snapshots(n: usize) -> Vec<EmployeeSnapshot> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    synthetic_population(n, start, end, 42)
}

fn trainer(n_threads: usize) -> RetentionTrainer {
    let config = BoostingConfig::builder()
        .n_threads(n_threads)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap();
    RetentionTrainer {
        cv_folds: 0,
        ..RetentionTrainer::new(config)
    }
}

// =============================================================================
// Training
// =============================================================================

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("retention/train");
    group.sample_size(10);

    for n in [1_000usize, 10_000] {
        let rows = snapshots(n);
        for threads in [1usize, 0] {
            let trainer = trainer(threads);
            let label = if threads == 1 { "sequential" } else { "parallel" };
            group.bench_with_input(BenchmarkId::new(label, n), &rows, |b, rows| {
                b.iter(|| black_box(trainer.train(black_box(rows)).unwrap()))
            });
        }
    }
    group.finish();
}

// =============================================================================
// Scoring
// =============================================================================

fn bench_scoring(c: &mut Criterion) {
    let (model, _) = trainer(0).train(&snapshots(2_000)).unwrap();
    let records: Vec<ScoringRecord> = snapshots(1_000)
        .iter()
        .map(ScoringRecord::from)
        .collect();

    let mut group = c.benchmark_group("retention/score");
    group.bench_function("single", |b| {
        b.iter(|| black_box(model.score(black_box(&records[0])).unwrap()))
    });
    group.bench_function("batch_1000", |b| {
        b.iter(|| {
            for r in &records {
                black_box(model.score(r).unwrap());
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_training, bench_scoring);
criterion_main!(benches);
