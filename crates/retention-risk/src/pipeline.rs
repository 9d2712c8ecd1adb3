//! End-to-end training driver.
//!
//! ```text
//! raw records ─► quality checks ─► derive ─► chronological split
//!             ─► encode ─► leakage scan ─► train + CV ─► holdout evaluation
//!             ─► tracking
//! ```
//!
//! The pipeline never writes model files itself; persist the returned
//! [`TrainingRun`] with [`crate::persist`].

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;
use tracing::{info, warn};

use crate::config::RetentionConfig;
use crate::data::{
    check_and_dedup, chronological_split, derive_features, read_raw_csv, DataQualityWarning,
    DatasetKey, DerivedPopulation, EmployeeSnapshot, FeatureCache, RawRecord,
};
use crate::error::{ConfigError, InputError, RetentionError, Result};
use crate::features::{Preprocessor, SafeFeatures, SAFE_FEATURES};
use crate::leakage::detect_leakage;
use crate::model::{ImportanceType, RetentionModel, RetentionTrainer};
use crate::report::{EvaluationReport, HoldoutMetrics};
use crate::tracking::{ExperimentTracker, JsonlTracker, NoopTracker, RunRecord};

/// Output of one training run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub model: RetentionModel,
    pub report: EvaluationReport,
}

/// Runs the full training flow for one configuration.
pub struct TrainingPipeline {
    config: RetentionConfig,
    tracker: Box<dyn ExperimentTracker>,
}

impl std::fmt::Debug for TrainingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TrainingPipeline {
    /// Pipeline tracking to `output.tracking_path` when set.
    pub fn new(config: RetentionConfig) -> Self {
        let tracker: Box<dyn ExperimentTracker> = match &config.output.tracking_path {
            Some(path) => Box::new(JsonlTracker::new(path.clone())),
            None => Box::new(NoopTracker),
        };
        Self { config, tracker }
    }

    pub fn with_tracker(mut self, tracker: impl ExperimentTracker + 'static) -> Self {
        self.tracker = Box::new(tracker);
        self
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Read `path` and run.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingInput`] when the file does not exist,
    /// plus everything [`Self::run`] returns.
    pub fn run_from_csv(&self, path: &Path) -> Result<TrainingRun> {
        let raw = read_raw_csv(path)?;
        info!(path = %path.display(), rows = raw.len(), "loaded raw population");
        self.run(raw)
    }

    /// Train and evaluate on a raw population.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DegenerateSplit`] when either side of the split is
    /// empty, including a future slice left empty once rows with categories
    /// unseen in training are excluded.
    pub fn run(&self, raw: Vec<RawRecord>) -> Result<TrainingRun> {
        self.config.validate()?;
        let (records, quality) = check_and_dedup(raw, &self.config.quality);
        let population = derive_features(&records, &self.config.data.derive_options())?;
        self.run_derived(&population, quality)
    }

    /// Like [`Self::run`], reusing a derived population from `cache` when the
    /// same records were derived before with the same options.
    pub fn run_cached(
        &self,
        source: &str,
        raw: Vec<RawRecord>,
        cache: &mut FeatureCache,
    ) -> Result<TrainingRun> {
        self.config.validate()?;
        let (records, quality) = check_and_dedup(raw, &self.config.quality);
        let key = DatasetKey::new(source, &records, &self.config.data.derive_options());
        let population = cache.get_or_derive(key, &records)?;
        self.run_derived(&population, quality)
    }

    fn run_derived(
        &self,
        population: &DerivedPopulation,
        mut quality: Vec<DataQualityWarning>,
    ) -> Result<TrainingRun> {
        let config = &self.config;

        let departed = population.report.departed_before_snapshot;
        if departed > 0 {
            quality.push(DataQualityWarning::DepartedBeforeSnapshot {
                rows: departed,
            });
        }
        let is_demo_data = population.is_demo_data();
        if is_demo_data {
            let synthesized_values = population.report.synthesized_values();
            let synthetic_records = population.report.synthetic_records;
            warn!(
                synthesized_values,
                synthetic_records,
                "DEMO DATA: inputs were synthesized or generated; metrics are not a real validation"
            );
            quality.push(DataQualityWarning::DemoData {
                synthesized_values,
                synthetic_records,
            });
        }

        // Split
        let split = chronological_split(population.snapshots.clone(), config.split.train_fraction)?;
        let cutoff = split.cutoff;
        let (train, test) = split.into_parts();
        info!(train = train.len(), test = test.len(), %cutoff, "chronological split");

        // Encode
        let train_features: Vec<SafeFeatures> =
            train.iter().map(SafeFeatures::from_snapshot).collect();
        let preprocessor = Preprocessor::fit(&train_features)?;
        let (test, unseen) = drop_unseen_categories(&preprocessor, test);
        if test.is_empty() {
            return Err(ConfigError::DegenerateSplit(format!(
                "every snapshot after {cutoff} has a category unseen in training"
            ))
            .into());
        }
        quality.extend(unseen);
        let test_features: Vec<SafeFeatures> =
            test.iter().map(SafeFeatures::from_snapshot).collect();
        let train_matrix = preprocessor.encode_unscaled_matrix(&train_features)?;
        let test_matrix = preprocessor.encode_unscaled_matrix(&test_features)?;

        // Leakage
        let labels: Array1<f64> = train.iter().map(|s| s.label_f32() as f64).collect();
        let leakage_warnings = detect_leakage(
            train_matrix.view(),
            test_matrix.view(),
            labels.view(),
            &SAFE_FEATURES,
            &config.leakage,
        );
        for w in &leakage_warnings {
            warn!(feature = w.feature(), "possible leakage: {w}");
        }
        if config.leakage.abort_on_warning && !leakage_warnings.is_empty() {
            return Err(RetentionError::LeakageAbort {
                warnings: leakage_warnings,
            });
        }
        for w in &quality {
            warn!("data quality: {w}");
        }

        // Train
        let trainer = RetentionTrainer {
            config: config.model.clone(),
            cv_folds: config.split.cv_folds,
            horizon_months: config.data.horizon_months,
            thresholds: config.risk,
        };
        let (model, cross_validation) = trainer.train(&train)?;

        // Evaluate on the future slice
        let probabilities = model.predict_snapshots(&test)?;
        let test_labels: Vec<f32> = test.iter().map(EmployeeSnapshot::label_f32).collect();
        let holdout = HoldoutMetrics::compute(&probabilities, &test_labels);

        let report = EvaluationReport {
            holdout,
            cross_validation,
            leakage_warnings,
            quality_warnings: quality,
            is_demo_data,
            training_cutoff: cutoff,
            n_train: train.len(),
            n_test: test.len(),
            feature_importance: model.feature_importance(ImportanceType::Gain),
        };
        let deployable = report.is_deployable(config.evaluation.min_deploy_auc);
        info!(
            auc = report.holdout.auc,
            accuracy = report.holdout.accuracy,
            f1 = report.holdout.f1,
            deployable,
            "holdout evaluation"
        );

        self.tracker.record(&self.run_record(&report, deployable));
        Ok(TrainingRun { model, report })
    }

    fn run_record(&self, report: &EvaluationReport, deployable: bool) -> RunRecord {
        let m = &self.config.model;
        let mut record = RunRecord::new("retention")
            .param("n_trees", m.n_trees)
            .param("max_depth", m.max_depth)
            .param("learning_rate", m.learning_rate)
            .param("subsample", m.subsample)
            .param("train_fraction", self.config.split.train_fraction)
            .param("horizon_months", self.config.data.horizon_months)
            .metric("holdout_auc", report.holdout.auc)
            .metric("holdout_accuracy", report.holdout.accuracy)
            .metric("holdout_f1", report.holdout.f1)
            .metric("holdout_log_loss", report.holdout.log_loss)
            .tag("demo_data", report.is_demo_data)
            .tag("deployable", deployable)
            .tag("leakage_warnings", report.leakage_warnings.len());
        if let Some(auc) = report.cross_validation.auc_mean {
            record = record.metric("cv_auc_mean", auc);
        }
        if let Some(f1) = report.cross_validation.f1_mean {
            record = record.metric("cv_f1_mean", f1);
        }
        record
    }
}

/// Split off evaluation rows whose department or level never appeared in
/// training, reporting one warning per unseen `(feature, value)`.
fn drop_unseen_categories(
    preprocessor: &Preprocessor,
    rows: Vec<EmployeeSnapshot>,
) -> (Vec<EmployeeSnapshot>, Vec<DataQualityWarning>) {
    let mut unseen: BTreeMap<(&'static str, String), usize> = BTreeMap::new();
    let kept = rows
        .into_iter()
        .filter(|s| match preprocessor.encode_unscaled(&SafeFeatures::from_snapshot(s)) {
            Err(InputError::UnseenCategory { feature, value, .. }) => {
                *unseen.entry((feature, value)).or_default() += 1;
                false
            }
            _ => true,
        })
        .collect();
    let warnings = unseen
        .into_iter()
        .map(|((feature, value), rows)| DataQualityWarning::UnseenCategoryInTest {
            feature: feature.to_string(),
            value,
            rows,
        })
        .collect();
    (kept, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{date_quantile, DerivationMode};
    use crate::model::BoostingConfig;
    use crate::testing::synthetic_raw_records;
    use crate::training::Verbosity;
    use chrono::NaiveDate;

    fn config() -> RetentionConfig {
        let mut config = RetentionConfig::default();
        config.model = BoostingConfig::builder()
            .n_trees(20)
            .max_depth(3)
            .n_threads(1)
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap();
        config.split.cv_folds = 2;
        config
    }

    fn generated(n: usize) -> Vec<RawRecord> {
        synthetic_raw_records(
            n,
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            3,
        )
    }

    /// Generated rows re-keyed as if exported from an HR system.
    fn raw(n: usize) -> Vec<RawRecord> {
        let mut rows = generated(n);
        for (i, r) in rows.iter_mut().enumerate() {
            r.employee_id = Some(format!("E{i:05}"));
        }
        rows
    }

    #[test]
    fn unseen_test_categories_are_excluded_and_reported() {
        let mut rows = raw(300);
        rows.sort_by_key(|r| r.snapshot_date);
        let last = rows.len() - 1;
        rows[last].department = Some("Esports".into());

        let run = TrainingPipeline::new(config()).run(rows).unwrap();
        assert!(run
            .report
            .quality_warnings
            .contains(&DataQualityWarning::UnseenCategoryInTest {
                feature: "department".into(),
                value: "Esports".into(),
                rows: 1,
            }));
        assert_eq!(run.report.n_train + run.report.n_test, 299);
    }

    #[test]
    fn holdout_of_only_unseen_categories_is_degenerate() {
        let mut rows = raw(300);
        let mut dates: Vec<NaiveDate> = rows.iter().filter_map(|r| r.snapshot_date).collect();
        dates.sort();
        let cutoff = date_quantile(&dates, config().split.train_fraction).unwrap();
        for r in rows.iter_mut().filter(|r| r.snapshot_date > Some(cutoff)) {
            r.department = Some("Esports".into());
        }

        let err = TrainingPipeline::new(config()).run(rows).unwrap_err();
        assert!(
            matches!(err, RetentionError::Config(ConfigError::DegenerateSplit(_))),
            "expected a degenerate split, got {err}"
        );
    }

    #[test]
    fn demo_mode_is_flagged() {
        let mut rows = raw(200);
        for r in &mut rows {
            r.team_size = None;
        }
        let mut config = config();
        config.data.derivation = DerivationMode::Demo;
        let run = TrainingPipeline::new(config).run(rows).unwrap();
        assert!(run.report.is_demo_data);
        assert!(run.report.quality_warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::DemoData { synthesized_values, synthetic_records: 0 }
                if *synthesized_values > 0
        )));
    }

    #[test]
    fn generated_population_is_demo_data_in_strict_mode() {
        let run = TrainingPipeline::new(config()).run(generated(200)).unwrap();
        assert!(run.report.is_demo_data);
        assert!(run.report.quality_warnings.contains(&DataQualityWarning::DemoData {
            synthesized_values: 0,
            synthetic_records: 200,
        }));

        let run = TrainingPipeline::new(config()).run(raw(200)).unwrap();
        assert!(!run.report.is_demo_data);
    }

    #[test]
    fn cache_is_reused_across_runs() {
        let pipeline = TrainingPipeline::new(config());
        let mut cache = FeatureCache::new();
        let a = pipeline
            .run_cached("synthetic", raw(200), &mut cache)
            .unwrap();
        let b = pipeline
            .run_cached("synthetic", raw(200), &mut cache)
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn leaky_label_column_aborts_when_requested() {
        // salary carries the label
        let mut rows = raw(300);
        for r in &mut rows {
            let leaves = r.will_leave_within_horizon.unwrap_or(false);
            r.salary_vs_market = Some(if leaves { 2.0 } else { 1.0 });
        }
        let mut config = config();
        config.leakage.abort_on_warning = true;
        let err = TrainingPipeline::new(config).run(rows).unwrap_err();
        match err {
            RetentionError::LeakageAbort { warnings } => {
                assert!(warnings.iter().any(|w| w.feature() == "salary_vs_market"));
            }
            other => panic!("expected leakage abort, got {other}"),
        }
    }

    #[test]
    fn missing_csv_is_a_config_error() {
        let err = TrainingPipeline::new(config())
            .run_from_csv(Path::new("/nonexistent/people.csv"))
            .unwrap_err();
        assert!(matches!(err, RetentionError::Config(ConfigError::MissingInput(_))));
    }
}
