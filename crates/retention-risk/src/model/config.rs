//! Boosting configuration with builder pattern.
//!
//! [`BoostingConfig`] holds every classifier hyperparameter. It can be built in
//! code through the `bon` builder (validated on `build()`) or deserialized
//! from the `[model]` section of the TOML config (validated by
//! [`crate::config::RetentionConfig::validate`]).
//!
//! # Example
//!
//! ```
//! use retention_risk::model::{BoostingConfig, ClassWeight};
//!
//! let config = BoostingConfig::builder()
//!     .n_trees(200)
//!     .max_depth(6)
//!     .class_weight(ClassWeight::Balanced)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.learning_rate, 0.1);
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::training::{GBDTParams, GainParams, Verbosity, MAX_BINS};

/// Class weighting for imbalanced labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Every row weighs 1.
    #[default]
    None,
    /// `w_c = n / (2 * n_c)`, so both classes carry equal total weight.
    Balanced,
}

impl ClassWeight {
    /// Per-row weights for 0/1 `labels`. Empty means uniform.
    pub fn weights(self, labels: &[f32]) -> Vec<f32> {
        match self {
            ClassWeight::None => Vec::new(),
            ClassWeight::Balanced => {
                let n = labels.len() as f64;
                let n_pos = labels.iter().filter(|&&l| l > 0.5).count() as f64;
                let n_neg = n - n_pos;
                if n_pos == 0.0 || n_neg == 0.0 {
                    return Vec::new();
                }
                let (w_pos, w_neg) = ((n / (2.0 * n_pos)) as f32, (n / (2.0 * n_neg)) as f32);
                labels
                    .iter()
                    .map(|&l| if l > 0.5 { w_pos } else { w_neg })
                    .collect()
            }
        }
    }
}

/// Gradient-boosted tree hyperparameters.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
#[serde(default, deny_unknown_fields)]
pub struct BoostingConfig {
    // === Boosting ===
    /// Number of boosting rounds. Default: 100.
    #[builder(default = 100)]
    pub n_trees: u32,

    /// Shrinkage. Default: 0.1.
    #[builder(default = 0.1)]
    pub learning_rate: f32,

    // === Tree structure ===
    /// Maximum tree depth. Default: 4.
    #[builder(default = 4)]
    pub max_depth: u32,

    /// Histogram bins per feature, 2..=256. Default: 64.
    #[builder(default = 64)]
    pub max_bins: usize,

    // === Regularization ===
    /// L2 leaf regularization. Default: 1.0.
    #[builder(default = 1.0)]
    pub reg_lambda: f32,

    /// Minimum hessian sum per child. Default: 1.0.
    #[builder(default = 1.0)]
    pub min_child_weight: f32,

    /// Minimum split gain. Default: 0.0.
    #[builder(default = 0.0)]
    pub min_gain: f32,

    /// Minimum rows per child. Default: 1.
    #[builder(default = 1)]
    pub min_samples_leaf: u32,

    // === Sampling ===
    /// Row subsample per round, in (0, 1]. Default: 0.8.
    #[builder(default = 0.8)]
    pub subsample: f32,

    /// Default: none. The scheduled batch job runs 200 trees of depth 6 with
    /// balanced weights; set those here to reproduce it.
    #[builder(default)]
    pub class_weight: ClassWeight,

    // === Resources ===
    /// 0 = rayon global pool, 1 = sequential, n = dedicated pool.
    #[builder(default = 0)]
    pub n_threads: usize,

    /// Random seed. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: boosting_config_builder::IsComplete> BoostingConfigBuilder<S> {
    /// Build and validate.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn build(self) -> Result<BoostingConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.1,
            max_depth: 4,
            max_bins: 64,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            min_gain: 0.0,
            min_samples_leaf: 1,
            subsample: 0.8,
            class_weight: ClassWeight::None,
            n_threads: 0,
            seed: 42,
            verbosity: Verbosity::default(),
        }
    }
}

impl BoostingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::invalid(
                "model.learning_rate",
                format!("must be in (0, 1], got {}", self.learning_rate),
            ));
        }
        if self.n_trees == 0 {
            return Err(ConfigError::invalid("model.n_trees", "must be at least 1"));
        }
        if self.max_depth == 0 || self.max_depth > 16 {
            return Err(ConfigError::invalid(
                "model.max_depth",
                format!("must be in 1..=16, got {}", self.max_depth),
            ));
        }
        if !(2..=MAX_BINS).contains(&self.max_bins) {
            return Err(ConfigError::invalid(
                "model.max_bins",
                format!("must be in 2..={MAX_BINS}, got {}", self.max_bins),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ConfigError::invalid(
                "model.subsample",
                format!("must be in (0, 1], got {}", self.subsample),
            ));
        }
        for (field, value) in [
            ("model.reg_lambda", self.reg_lambda),
            ("model.min_child_weight", self.min_child_weight),
            ("model.min_gain", self.min_gain),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be non-negative, got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Low-level trainer parameters.
    pub fn to_params(&self) -> GBDTParams {
        GBDTParams {
            n_trees: self.n_trees,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            max_bins: self.max_bins,
            gain: GainParams {
                reg_lambda: self.reg_lambda,
                min_gain: self.min_gain,
                min_child_weight: self.min_child_weight,
                min_samples_leaf: self.min_samples_leaf,
            },
            subsample: self.subsample,
            verbosity: self.verbosity,
            seed: self.seed,
        }
    }
}
