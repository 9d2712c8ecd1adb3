//! The trained retention-risk model.

use serde::{Deserialize, Serialize};

use super::meta::ModelMeta;
use super::risk::{RiskBand, RiskScore};
use crate::data::EmployeeSnapshot;
use crate::error::InputError;
use crate::features::{Preprocessor, SafeFeatures, ScoringRecord, N_FEATURES, SAFE_FEATURES};
use crate::repr::Forest;

/// How [`RetentionModel::feature_importance`] aggregates splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportanceType {
    /// Number of splits on the feature.
    Split,
    /// Total gain of splits on the feature.
    #[default]
    Gain,
    /// Total hessian mass routed through splits on the feature.
    Cover,
}

/// Normalized importance of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Fitted preprocessing plus boosted forest.
///
/// Immutable once built: there is no `&mut self` API, so a model can be
/// shared across scoring threads as-is. Retraining produces a new model.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionModel {
    preprocessor: Preprocessor,
    forest: Forest,
    meta: ModelMeta,
}

impl RetentionModel {
    pub fn new(preprocessor: Preprocessor, forest: Forest, meta: ModelMeta) -> Self {
        Self {
            preprocessor,
            forest,
            meta,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// Positive-class probability for validated features.
    pub fn predict_proba(&self, features: &SafeFeatures) -> Result<f64, InputError> {
        let row = self.preprocessor.transform_one(features)?;
        Ok(self.forest.predict_proba(&row))
    }

    pub fn band(&self, probability: f64) -> RiskBand {
        self.meta.thresholds.band(probability)
    }

    /// Score a what-if record.
    ///
    /// # Errors
    ///
    /// - [`InputError::MissingFeature`] for an absent field
    /// - [`InputError::NonFinite`] for NaN or infinite numerics
    /// - [`InputError::UnseenCategory`] for a department or level the model
    ///   never saw
    pub fn score(&self, record: &ScoringRecord) -> Result<RiskScore, InputError> {
        let features = record.validate()?;
        let probability = self.predict_proba(&features)?;
        Ok(RiskScore {
            probability,
            band: self.band(probability),
        })
    }

    /// Probabilities for a batch of snapshots.
    pub fn predict_snapshots(
        &self,
        snapshots: &[EmployeeSnapshot],
    ) -> Result<Vec<f64>, InputError> {
        snapshots
            .iter()
            .map(|s| self.predict_proba(&SafeFeatures::from_snapshot(s)))
            .collect()
    }

    /// Per-feature importance, normalized to sum to 1 (all zeros when the
    /// forest has no splits), in schema order.
    pub fn feature_importance(&self, kind: ImportanceType) -> Vec<FeatureImportance> {
        let mut totals = [0.0f64; N_FEATURES];
        for tree in self.forest.trees() {
            for node in 0..tree.n_nodes() as u32 {
                if tree.is_leaf(node) {
                    continue;
                }
                let f = tree.split_feature(node) as usize;
                if f < N_FEATURES {
                    totals[f] += match kind {
                        ImportanceType::Split => 1.0,
                        ImportanceType::Gain => tree.gain(node) as f64,
                        ImportanceType::Cover => tree.cover(node) as f64,
                    };
                }
            }
        }
        let sum: f64 = totals.iter().sum();
        SAFE_FEATURES
            .iter()
            .zip(totals)
            .map(|(spec, t)| FeatureImportance {
                feature: spec.name.to_string(),
                importance: if sum > 0.0 { t / sum } else { 0.0 },
            })
            .collect()
    }
}
