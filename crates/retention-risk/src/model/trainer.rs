//! Fit a [`RetentionModel`] on chronologically ordered snapshots.

use tracing::{debug, info};

use super::config::BoostingConfig;
use super::meta::ModelMeta;
use super::retention::RetentionModel;
use super::risk::RiskThresholds;
use crate::data::{sort_chronologically, EmployeeSnapshot};
use crate::error::{DataError, Result};
use crate::features::{feature_names, Preprocessor, SafeFeatures};
use crate::report::{CrossValidationReport, FoldResult};
use crate::repr::Forest;
use crate::training::{time_series_folds, Auc, GBDTParams, GBDTTrainer, MetricFn, Verbosity, F1};
use crate::utils::{run_with_threads, Parallelism};

/// Trains the preprocessing transform and the boosted forest together.
#[derive(Debug, Clone)]
pub struct RetentionTrainer {
    pub config: BoostingConfig,
    /// Expanding-window CV folds. 0 disables cross-validation.
    pub cv_folds: usize,
    pub horizon_months: u32,
    pub thresholds: RiskThresholds,
}

impl Default for RetentionTrainer {
    fn default() -> Self {
        Self::new(BoostingConfig::default())
    }
}

impl RetentionTrainer {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            cv_folds: 5,
            horizon_months: 6,
            thresholds: RiskThresholds::default(),
        }
    }

    /// Cross-validate, then refit on every row.
    ///
    /// Rows are sorted chronologically first; input order does not matter.
    ///
    /// # Errors
    ///
    /// - [`DataError::Empty`] for no rows
    /// - [`DataError::SingleClass`] when every label is the same
    /// - [`crate::error::ConfigError`] for invalid hyperparameters or a
    ///   thread pool that cannot be built
    pub fn train(
        &self,
        snapshots: &[EmployeeSnapshot],
    ) -> Result<(RetentionModel, CrossValidationReport)> {
        self.config.validate()?;
        self.thresholds.validate()?;
        if snapshots.is_empty() {
            return Err(DataError::Empty.into());
        }
        let positives = snapshots
            .iter()
            .filter(|s| s.will_leave_within_horizon)
            .count();
        if positives == 0 || positives == snapshots.len() {
            return Err(DataError::SingleClass {
                positives,
                total: snapshots.len(),
            }
            .into());
        }

        let mut rows = snapshots.to_vec();
        sort_chronologically(&mut rows);

        run_with_threads(self.config.n_threads, |parallelism| -> Result<_> {
            let cv = self.cross_validate(&rows, parallelism)?;
            let (preprocessor, forest) = self.fit(&rows, &self.config.to_params(), parallelism)?;
            let meta = ModelMeta {
                feature_names: feature_names(),
                horizon_months: self.horizon_months,
                training_cutoff: rows.last().map(|s| s.snapshot_date),
                n_train_rows: rows.len(),
                thresholds: self.thresholds,
            };
            Ok((RetentionModel::new(preprocessor, forest, meta), cv))
        })?
    }

    fn fit(
        &self,
        rows: &[EmployeeSnapshot],
        params: &GBDTParams,
        parallelism: Parallelism,
    ) -> Result<(Preprocessor, Forest)> {
        let features: Vec<SafeFeatures> = rows.iter().map(SafeFeatures::from_snapshot).collect();
        let labels: Vec<f32> = rows.iter().map(EmployeeSnapshot::label_f32).collect();
        let preprocessor = Preprocessor::fit(&features)?;
        let matrix = preprocessor.transform(&features)?;
        let weights = self.config.class_weight.weights(&labels);
        let forest = GBDTTrainer::new(params.clone()).train(
            matrix.view(),
            &labels,
            &weights,
            parallelism,
        )?;
        Ok((preprocessor, forest))
    }

    fn cross_validate(
        &self,
        rows: &[EmployeeSnapshot],
        parallelism: Parallelism,
    ) -> Result<CrossValidationReport> {
        let dates: Vec<_> = rows.iter().map(|s| s.snapshot_date).collect();
        let mut params = self.config.to_params();
        params.verbosity = params.verbosity.min(Verbosity::Warning);

        let mut results = Vec::new();
        for fold in time_series_folds(&dates, self.cv_folds) {
            let train = &rows[fold.train.clone()];
            let valid = &rows[fold.valid.clone()];
            if !has_both_classes(train) {
                debug!(fold = fold.index, "skipping fold: training slice has a single class");
                continue;
            }

            let (preprocessor, forest) = self.fit(train, &params, parallelism)?;

            // Validation rows with categories the fold never saw cannot be scored.
            let mut probabilities = Vec::with_capacity(valid.len());
            let mut labels = Vec::with_capacity(valid.len());
            for snapshot in valid {
                let features = SafeFeatures::from_snapshot(snapshot);
                if let Ok(row) = preprocessor.transform_one(&features) {
                    probabilities.push(forest.predict_proba(&row));
                    labels.push(snapshot.label_f32());
                }
            }
            if labels.is_empty() {
                debug!(fold = fold.index, "skipping fold: no scorable validation rows");
                continue;
            }

            let result = FoldResult {
                fold: fold.index,
                n_train: train.len(),
                n_valid: labels.len(),
                auc: Auc.compute(&probabilities, &labels),
                f1: F1::default().compute(&probabilities, &labels),
            };
            debug!(
                fold = result.fold,
                auc = result.auc,
                f1 = result.f1,
                "fold evaluated"
            );
            results.push(result);
        }

        let report = CrossValidationReport::from_folds(results);
        if let (Some(auc), Some(f1)) = (report.auc_mean, report.f1_mean) {
            info!(
                folds = report.n_folds(),
                auc_mean = auc,
                f1_mean = f1,
                "cross-validation finished"
            );
        }
        Ok(report)
    }
}

fn has_both_classes(rows: &[EmployeeSnapshot]) -> bool {
    let positives = rows.iter().filter(|s| s.will_leave_within_horizon).count();
    positives > 0 && positives < rows.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetentionError;
    use crate::model::ClassWeight;
    use crate::testing::synthetic_population;
    use chrono::NaiveDate;

    fn small_config() -> BoostingConfig {
        BoostingConfig::builder()
            .n_trees(20)
            .max_depth(3)
            .n_threads(1)
            .verbosity(Verbosity::Silent)
            .build()
            .unwrap()
    }

    fn population(n: usize) -> Vec<EmployeeSnapshot> {
        synthetic_population(
            n,
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            7,
        )
    }

    #[test]
    fn trains_with_cross_validation() {
        let rows = population(400);
        let trainer = RetentionTrainer {
            cv_folds: 3,
            ..RetentionTrainer::new(small_config())
        };
        let (model, cv) = trainer.train(&rows).unwrap();

        assert_eq!(model.forest().n_trees(), 20);
        assert_eq!(model.meta().n_train_rows, 400);
        assert_eq!(
            model.meta().training_cutoff,
            rows.iter().map(|s| s.snapshot_date).max()
        );
        assert_eq!(cv.n_folds(), 3);
        for fold in &cv.folds {
            assert!((0.0..=1.0).contains(&fold.auc));
        }
    }

    #[test]
    fn input_order_does_not_matter() {
        let rows = population(200);
        let mut reversed = rows.clone();
        reversed.reverse();
        let trainer = RetentionTrainer {
            cv_folds: 0,
            ..RetentionTrainer::new(small_config())
        };
        let (a, _) = trainer.train(&rows).unwrap();
        let (b, _) = trainer.train(&reversed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn balanced_weights_lift_leaver_scores() {
        let rows = population(300);
        let positives = rows.iter().filter(|s| s.will_leave_within_horizon).count();
        let positive_rate = positives as f64 / rows.len() as f64;
        assert!(positive_rate < 0.5, "positive rate = {positive_rate}");
        let held_out = synthetic_population(
            300,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            11,
        );

        // 200 trees of depth 6, balanced: the scheduled batch job's settings.
        let config = |class_weight: ClassWeight| {
            BoostingConfig::builder()
                .n_trees(200)
                .max_depth(6)
                .class_weight(class_weight)
                .n_threads(1)
                .verbosity(Verbosity::Silent)
                .build()
                .unwrap()
        };
        let mean_score = |class_weight: ClassWeight| {
            let trainer = RetentionTrainer {
                cv_folds: 0,
                ..RetentionTrainer::new(config(class_weight))
            };
            let (model, _) = trainer.train(&rows).unwrap();
            let probs = model.predict_snapshots(&held_out).unwrap();
            probs.iter().sum::<f64>() / probs.len() as f64
        };
        assert!(mean_score(ClassWeight::Balanced) > mean_score(ClassWeight::None));
    }

    #[test]
    fn single_class_is_rejected() {
        let mut rows = population(50);
        for r in &mut rows {
            r.will_leave_within_horizon = false;
        }
        let err = RetentionTrainer::default().train(&rows).unwrap_err();
        assert!(matches!(
            err,
            RetentionError::Data(DataError::SingleClass {
                positives: 0,
                total: 50
            })
        ));
    }

    #[test]
    fn empty_is_rejected() {
        assert!(matches!(
            RetentionTrainer::default().train(&[]),
            Err(RetentionError::Data(DataError::Empty))
        ));
    }
}
