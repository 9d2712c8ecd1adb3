//! Run configuration loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. Unknown keys are rejected to catch typos.
//!
//! ```toml
//! [data]
//! input_path = "snapshots.csv"
//! horizon_months = 6
//! derivation = "strict"   # or "demo"
//!
//! [split]
//! train_fraction = 0.8
//! cv_folds = 5
//!
//! [leakage]
//! max_abs_correlation = 0.9
//! max_relative_drift = 0.2
//! abort_on_warning = false
//!
//! [model]
//! n_trees = 100
//! max_depth = 4
//!
//! [risk]
//! high = 0.7
//! moderate = 0.4
//!
//! [evaluation]
//! min_deploy_auc = 0.75
//!
//! [output]
//! model_path = "model.rrsk"
//! report_path = "report.json"
//! tracking_path = "runs.jsonl"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{DerivationMode, DeriveOptions, QualityPolicy};
use crate::error::ConfigError;
use crate::leakage::LeakagePolicy;
use crate::model::{BoostingConfig, RiskThresholds};

// =============================================================================
// Sections
// =============================================================================

/// `[data]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub input_path: Option<PathBuf>,
    /// Label horizon in months.
    pub horizon_months: u32,
    pub derivation: DerivationMode,
    /// Seed for demo-mode synthesis.
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            horizon_months: 6,
            derivation: DerivationMode::Strict,
            seed: 42,
        }
    }
}

impl DataConfig {
    pub fn derive_options(&self) -> DeriveOptions {
        DeriveOptions {
            mode: self.derivation,
            seed: self.seed,
            horizon_months: self.horizon_months,
        }
    }
}

/// `[split]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Date quantile used as the train/test cutoff.
    pub train_fraction: f64,
    /// Time-series CV folds on the training slice; 0 disables CV.
    pub cv_folds: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            cv_folds: 5,
        }
    }
}

/// `[evaluation]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Holdout AUC a model must exceed to count as deployable.
    pub min_deploy_auc: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_deploy_auc: 0.75,
        }
    }
}

/// `[output]`. Unset paths are simply not written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub model_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub tracking_path: Option<PathBuf>,
}

// =============================================================================
// RetentionConfig
// =============================================================================

/// Complete run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub leakage: LeakagePolicy,
    pub quality: QualityPolicy,
    pub model: BoostingConfig,
    pub risk: RiskThresholds,
    pub evaluation: EvaluationConfig,
    pub output: OutputConfig,
}

impl RetentionConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section. Reports the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.horizon_months == 0 {
            return Err(ConfigError::invalid("data.horizon_months", "must be at least 1"));
        }
        let f = self.split.train_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(ConfigError::invalid(
                "split.train_fraction",
                format!("must be in (0, 1), got {f}"),
            ));
        }
        let q = self.quality.max_missing_fraction;
        if !(0.0..=1.0).contains(&q) {
            return Err(ConfigError::invalid(
                "quality.max_missing_fraction",
                format!("must be in [0, 1], got {q}"),
            ));
        }
        let auc = self.evaluation.min_deploy_auc;
        if !(0.0..=1.0).contains(&auc) {
            return Err(ConfigError::invalid(
                "evaluation.min_deploy_auc",
                format!("must be in [0, 1], got {auc}"),
            ));
        }
        self.leakage.validate()?;
        self.model.validate()?;
        self.risk.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassWeight;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = RetentionConfig::from_toml_str("").unwrap();
        assert_eq!(config, RetentionConfig::default());
        assert_eq!(config.split.train_fraction, 0.8);
        assert_eq!(config.model.n_trees, 100);
        assert_eq!(config.risk.high, 0.7);
    }

    #[test]
    fn sections_override_defaults() {
        let config = RetentionConfig::from_toml_str(
            r#"
            [data]
            input_path = "people.csv"
            derivation = "demo"
            horizon_months = 12

            [model]
            n_trees = 50
            class_weight = "balanced"

            [output]
            model_path = "out/model.rrsk"
            "#,
        )
        .unwrap();
        assert_eq!(config.data.input_path.as_deref(), Some(Path::new("people.csv")));
        assert_eq!(config.data.derive_options().mode, DerivationMode::Demo);
        assert_eq!(config.data.derive_options().horizon_months, 12);
        assert_eq!(config.model.n_trees, 50);
        assert_eq!(config.model.class_weight, ClassWeight::Balanced);
        assert_eq!(config.split.cv_folds, 5);
    }

    #[test]
    fn invalid_values_name_the_field() {
        let err = RetentionConfig::from_toml_str("[split]\ntrain_fraction = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "split.train_fraction", .. }));

        let err = RetentionConfig::from_toml_str("[model]\nlearning_rate = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "model.learning_rate", .. }));

        let err = RetentionConfig::from_toml_str("[risk]\nhigh = 0.3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "risk", .. }));
    }

    #[test]
    fn typos_are_parse_errors() {
        assert!(matches!(
            RetentionConfig::from_toml_str("[split]\ntrain_frac = 0.7"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RetentionConfig::from_file(Path::new("/nonexistent/retention.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
