//! Evaluation reports.
//!
//! [`EvaluationReport`] is built once at the end of a training run and never
//! mutated. It serializes to JSON and prints as a short human summary.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::DataQualityWarning;
use crate::leakage::LeakageWarning;
use crate::model::FeatureImportance;
use crate::training::{Accuracy, Auc, LogLoss, MetricFn, F1};
use crate::utils::mean_std;

// =============================================================================
// Holdout metrics
// =============================================================================

/// Metrics on the held-out future slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutMetrics {
    pub n_rows: usize,
    pub n_positive: usize,
    pub accuracy: f64,
    pub auc: f64,
    pub f1: f64,
    pub log_loss: f64,
}

impl HoldoutMetrics {
    pub fn compute(probabilities: &[f64], labels: &[f32]) -> Self {
        Self {
            n_rows: labels.len(),
            n_positive: labels.iter().filter(|&&l| l > 0.5).count(),
            accuracy: Accuracy::default().compute(probabilities, labels),
            auc: Auc.compute(probabilities, labels),
            f1: F1::default().compute(probabilities, labels),
            log_loss: LogLoss.compute(probabilities, labels),
        }
    }
}

// =============================================================================
// Cross-validation
// =============================================================================

/// Scores for one time-series fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub n_train: usize,
    pub n_valid: usize,
    pub auc: f64,
    pub f1: f64,
}

/// Per-fold scores with mean and standard deviation.
///
/// Summary statistics are `None` when no fold could be evaluated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldResult>,
    pub auc_mean: Option<f64>,
    pub auc_std: Option<f64>,
    pub f1_mean: Option<f64>,
    pub f1_std: Option<f64>,
}

impl CrossValidationReport {
    pub fn from_folds(folds: Vec<FoldResult>) -> Self {
        if folds.is_empty() {
            return Self::default();
        }
        let aucs: Vec<f64> = folds.iter().map(|f| f.auc).collect();
        let f1s: Vec<f64> = folds.iter().map(|f| f.f1).collect();
        let (auc_mean, auc_std) = mean_std(&aucs);
        let (f1_mean, f1_std) = mean_std(&f1s);
        Self {
            folds,
            auc_mean: Some(auc_mean),
            auc_std: Some(auc_std),
            f1_mean: Some(f1_mean),
            f1_std: Some(f1_std),
        }
    }

    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }
}

// =============================================================================
// EvaluationReport
// =============================================================================

/// Everything learned about one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub holdout: HoldoutMetrics,
    pub cross_validation: CrossValidationReport,
    pub leakage_warnings: Vec<LeakageWarning>,
    pub quality_warnings: Vec<DataQualityWarning>,
    /// Some inputs were synthesized; metrics do not validate anything real.
    pub is_demo_data: bool,
    pub training_cutoff: NaiveDate,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_importance: Vec<FeatureImportance>,
}

impl EvaluationReport {
    /// Holdout AUC strictly above `min_auc` and no leakage warnings.
    pub fn is_deployable(&self, min_auc: f64) -> bool {
        self.holdout.auc > min_auc && self.leakage_warnings.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_demo_data {
            writeln!(
                f,
                "*** DEMO DATA: synthesized or generated inputs, not a real validation ***"
            )?;
        }
        writeln!(
            f,
            "train rows: {} (through {}), test rows: {}",
            self.n_train, self.training_cutoff, self.n_test
        )?;
        let h = &self.holdout;
        writeln!(
            f,
            "holdout: auc={:.3} accuracy={:.3} f1={:.3} logloss={:.4} ({} positive of {})",
            h.auc, h.accuracy, h.f1, h.log_loss, h.n_positive, h.n_rows
        )?;
        let cv = &self.cross_validation;
        writeln!(
            f,
            "cv ({} folds): auc={} ± {} f1={} ± {}",
            cv.n_folds(),
            fmt_opt(cv.auc_mean),
            fmt_opt(cv.auc_std),
            fmt_opt(cv.f1_mean),
            fmt_opt(cv.f1_std)
        )?;
        for w in &self.leakage_warnings {
            writeln!(f, "leakage: {w}")?;
        }
        for w in &self.quality_warnings {
            writeln!(f, "quality: {w}")?;
        }
        let mut top: Vec<&FeatureImportance> = self.feature_importance.iter().collect();
        top.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        write!(f, "top features:")?;
        for fi in top.iter().take(3) {
            write!(f, " {}={:.3}", fi.feature, fi.importance)?;
        }
        Ok(())
    }
}
