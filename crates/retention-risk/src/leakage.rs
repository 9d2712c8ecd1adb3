//! Leakage detection.
//!
//! Two heuristics run on the encoded (unscaled) matrices:
//!
//! - **Suspicious correlation**: a feature whose absolute Pearson correlation
//!   with the training label exceeds the policy threshold is probably a proxy
//!   for the label.
//! - **Covariate drift**: a continuous feature whose mean moves too far between
//!   the train and test slices suggests the feature encodes time or the
//!   future.
//!
//! Both are warnings. The pipeline decides whether to abort.

use std::fmt;

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::features::{FeatureKind, FeatureSpec};
use crate::utils::{mean, pearson};

/// Train means below this magnitude are compared in absolute terms.
const NEAR_ZERO_MEAN: f64 = 1e-9;

/// Leakage thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeakagePolicy {
    pub max_abs_correlation: f64,
    pub max_relative_drift: f64,
    /// Abort training when any warning is raised.
    pub abort_on_warning: bool,
}

impl Default for LeakagePolicy {
    fn default() -> Self {
        Self {
            max_abs_correlation: 0.9,
            max_relative_drift: 0.2,
            abort_on_warning: false,
        }
    }
}

impl LeakagePolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_abs_correlation > 0.0 && self.max_abs_correlation <= 1.0) {
            return Err(ConfigError::invalid(
                "leakage.max_abs_correlation",
                format!("must be in (0, 1], got {}", self.max_abs_correlation),
            ));
        }
        if !(self.max_relative_drift > 0.0 && self.max_relative_drift.is_finite()) {
            return Err(ConfigError::invalid(
                "leakage.max_relative_drift",
                format!("must be positive, got {}", self.max_relative_drift),
            ));
        }
        Ok(())
    }
}

/// A suspected leak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeakageWarning {
    SuspiciousCorrelation {
        feature: String,
        correlation: f64,
    },
    CovariateDrift {
        feature: String,
        train_mean: f64,
        test_mean: f64,
        drift: f64,
    },
}

impl LeakageWarning {
    pub fn feature(&self) -> &str {
        match self {
            Self::SuspiciousCorrelation { feature, .. }
            | Self::CovariateDrift { feature, .. } => feature,
        }
    }
}

impl fmt::Display for LeakageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuspiciousCorrelation {
                feature,
                correlation,
            } => {
                write!(f, "{feature}: correlation with label {correlation:+.3}")
            }
            Self::CovariateDrift {
                feature,
                train_mean,
                test_mean,
                drift,
            } => write!(
                f,
                "{feature}: mean moved {:.1}% ({train_mean:.3} -> {test_mean:.3})",
                drift * 100.0
            ),
        }
    }
}

/// Scan for likely leakage.
///
/// `train` and `test` are `(n_rows, n_features)` matrices whose columns follow
/// `schema`; `labels` align with `train` rows. Columns beyond the schema are
/// ignored. Never panics on degenerate input; an empty result means nothing
/// was found.
pub fn detect_leakage(
    train: ArrayView2<f64>,
    test: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    schema: &[FeatureSpec],
    policy: &LeakagePolicy,
) -> Vec<LeakageWarning> {
    let mut warnings = Vec::new();
    let labels: Vec<f64> = labels.to_vec();
    let n_cols = schema.len().min(train.ncols());

    for (c, spec) in schema.iter().enumerate().take(n_cols) {
        let column: Vec<f64> = train.column(c).to_vec();

        if let Some(r) = pearson(&column, &labels) {
            if r.abs() > policy.max_abs_correlation {
                warnings.push(LeakageWarning::SuspiciousCorrelation {
                    feature: spec.name.to_string(),
                    correlation: r,
                });
            }
        }

        if spec.kind != FeatureKind::Continuous
            || c >= test.ncols()
            || column.is_empty()
            || test.nrows() == 0
        {
            continue;
        }
        let train_mean = mean(column.iter().copied());
        let test_mean = mean(test.column(c).iter().copied());
        let diff = (test_mean - train_mean).abs();
        let drift = if train_mean.abs() < NEAR_ZERO_MEAN {
            diff
        } else {
            diff / train_mean.abs()
        };
        if drift.is_finite() && drift > policy.max_relative_drift {
            warnings.push(LeakageWarning::CovariateDrift {
                feature: spec.name.to_string(),
                train_mean,
                test_mean,
                drift,
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SAFE_FEATURES;
    use ndarray::{array, Array1, Array2};

    const CONT: FeatureSpec = FeatureSpec {
        name: "x",
        kind: FeatureKind::Continuous,
    };
    const BIN: FeatureSpec = FeatureSpec {
        name: "b",
        kind: FeatureKind::Binary,
    };

    #[test]
    fn feature_equal_to_label_is_flagged() {
        let labels = Array1::from(vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
        let train = labels.clone().insert_axis(ndarray::Axis(1));
        let warnings = detect_leakage(
            train.view(),
            train.view(),
            labels.view(),
            &[CONT],
            &LeakagePolicy::default(),
        );
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            LeakageWarning::SuspiciousCorrelation { feature, correlation }
                if feature == "x" && (*correlation - 1.0).abs() < 1e-12
        ));
    }

    #[test]
    fn zero_variance_is_silent() {
        let train = Array2::from_elem((5, 1), 3.0);
        let labels = Array1::from(vec![0.0, 1.0, 0.0, 1.0, 1.0]);
        let warnings = detect_leakage(
            train.view(),
            train.view(),
            labels.view(),
            &[CONT],
            &LeakagePolicy::default(),
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn drift_only_on_continuous_columns() {
        let train = array![[10.0, 0.0], [10.0, 1.0], [10.0, 0.0], [10.0, 0.0]];
        let test = array![[15.0, 1.0], [15.0, 1.0]];
        let labels = Array1::from(vec![0.0, 1.0, 1.0, 0.0]);
        let warnings = detect_leakage(
            train.view(),
            test.view(),
            labels.view(),
            &[CONT, BIN],
            &LeakagePolicy::default(),
        );
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            LeakageWarning::CovariateDrift { feature, drift, .. }
                if feature == "x" && (*drift - 0.5).abs() < 1e-12
        ));
    }

    #[test]
    fn near_zero_mean_uses_absolute_difference() {
        let train = array![[-1.0], [1.0]];
        let test = array![[0.1], [0.1]];
        let labels = Array1::from(vec![0.0, 1.0]);
        let policy = LeakagePolicy {
            max_abs_correlation: 1.0,
            ..Default::default()
        };
        assert!(
            detect_leakage(train.view(), test.view(), labels.view(), &[CONT], &policy).is_empty()
        );
    }

    #[test]
    fn empty_inputs_do_not_panic() {
        let empty = Array2::<f64>::zeros((0, SAFE_FEATURES.len()));
        let labels = Array1::<f64>::zeros(0);
        let warnings = detect_leakage(
            empty.view(),
            empty.view(),
            labels.view(),
            &SAFE_FEATURES,
            &LeakagePolicy::default(),
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn policy_validation() {
        assert!(LeakagePolicy::default().validate().is_ok());
        let bad = LeakagePolicy {
            max_abs_correlation: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
