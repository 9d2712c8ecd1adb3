//! Full training runs on synthetic populations.

mod common;

use std::fs::File;

use retention_risk::data::write_snapshots_csv;
use retention_risk::persist::{load_model, save_model, save_report_json};
use retention_risk::{EvaluationReport, RetentionConfig, ScoringRecord, TrainingPipeline};

use common::{fast_config, population, raw_population, study_window};

#[test]
fn thousand_snapshots_two_years() {
    let run = TrainingPipeline::new(fast_config(60))
        .run(raw_population(1000, 2024))
        .unwrap();
    let report = &run.report;

    assert_eq!(report.n_train + report.n_test, 1000);
    // Default train_fraction 0.8 over uniformly spread dates.
    assert!((780..=820).contains(&report.n_train), "n_train = {}", report.n_train);
    let (start, end) = study_window();
    assert!(report.training_cutoff >= start && report.training_cutoff < end);

    assert!((0.5..=1.0).contains(&report.holdout.auc), "auc = {}", report.holdout.auc);
    assert!(report.leakage_warnings.is_empty(), "{:?}", report.leakage_warnings);
    // Generated ids are tagged, so the run is labelled as demo data.
    assert!(report.is_demo_data);

    assert!(report.cross_validation.n_folds() > 0);
    let cv_auc = report.cross_validation.auc_mean.unwrap();
    assert!((0.0..=1.0).contains(&cv_auc));

    let total: f64 = report.feature_importance.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(run.model.meta().n_train_rows, report.n_train);
    assert_eq!(run.model.meta().training_cutoff, Some(report.training_cutoff));
}

#[test]
fn csv_to_saved_model_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("snapshots.csv");
    write_snapshots_csv(File::create(&csv_path).unwrap(), &population(400, 8)).unwrap();

    let config_path = dir.path().join("retention.toml");
    std::fs::write(
        &config_path,
        format!(
            concat!(
                "[data]\ninput_path = {:?}\n\n",
                "[split]\ncv_folds = 3\n\n",
                "[model]\nn_trees = 20\nmax_depth = 3\nn_threads = 1\nverbosity = \"silent\"\n",
            ),
            csv_path.display().to_string()
        ),
    )
    .unwrap();
    let config = RetentionConfig::from_file(&config_path).unwrap();
    let input = config.data.input_path.clone().unwrap();

    let run = TrainingPipeline::new(config).run_from_csv(&input).unwrap();
    assert_eq!(run.report.n_train + run.report.n_test, 400);

    let model_path = dir.path().join("model.rrsk");
    let report_path = dir.path().join("report.json");
    save_model(&run.model, &model_path).unwrap();
    save_report_json(&run.report, &report_path).unwrap();

    let loaded = load_model(&model_path).unwrap();
    let record: ScoringRecord = serde_json::from_str(
        r#"{"tenure_months": 4, "salary_vs_market": 0.85, "days_since_promotion": 100,
            "manager_tenure_months": 12, "team_size": 8, "is_neurodivergent": false,
            "department": "Art", "level": "Junior"}"#,
    )
    .unwrap();
    assert_eq!(loaded.score(&record).unwrap(), run.model.score(&record).unwrap());

    let report: EvaluationReport =
        serde_json::from_slice(&std::fs::read(&report_path).unwrap()).unwrap();
    assert_eq!(report, run.report);
}

#[test]
fn tracking_records_one_line_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config(10);
    config.split.cv_folds = 0;
    config.output.tracking_path = Some(dir.path().join("runs.jsonl"));

    let pipeline = TrainingPipeline::new(config);
    pipeline.run(raw_population(200, 1)).unwrap();
    pipeline.run(raw_population(200, 2)).unwrap();

    let text = std::fs::read_to_string(dir.path().join("runs.jsonl")).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("holdout_auc"));
}

#[test]
fn thread_count_does_not_change_the_model() {
    let mut sequential = fast_config(15);
    sequential.split.cv_folds = 0;
    let mut parallel = sequential.clone();
    parallel.model.n_threads = 4;

    let a = TrainingPipeline::new(sequential)
        .run(raw_population(300, 4))
        .unwrap();
    let b = TrainingPipeline::new(parallel)
        .run(raw_population(300, 4))
        .unwrap();
    assert_eq!(a.model, b.model);
    assert_eq!(a.report.holdout, b.report.holdout);
}
