//! Model metadata.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::risk::RiskThresholds;
use crate::features::feature_names;

/// Facts about how a model was trained, carried with it and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Input columns, in matrix order.
    pub feature_names: Vec<String>,
    pub horizon_months: u32,
    /// Latest snapshot date in the training data.
    pub training_cutoff: Option<NaiveDate>,
    pub n_train_rows: usize,
    pub thresholds: RiskThresholds,
}

impl Default for ModelMeta {
    fn default() -> Self {
        Self {
            feature_names: feature_names(),
            horizon_months: 6,
            training_cutoff: None,
            n_train_rows: 0,
            thresholds: RiskThresholds::default(),
        }
    }
}
