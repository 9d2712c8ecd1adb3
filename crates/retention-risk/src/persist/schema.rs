//! Versioned payload schema.
//!
//! Schema types are kept apart from runtime types so the on-disk layout can
//! evolve on its own. New versions add a [`Payload`] variant; existing
//! variants never change.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;
use crate::features::{
    CategoryEncoder, Preprocessor, StandardScaler, N_CONTINUOUS, N_FEATURES,
};
use crate::model::{ModelMeta, RetentionModel, RiskThresholds};
use crate::repr::{Forest, Tree};

/// Version-tagged payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    V1(PayloadV1),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadV1 {
    pub meta: ModelMetaSchema,
    pub preprocessor: PreprocessorSchema,
    pub forest: ForestSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetaSchema {
    pub feature_names: Vec<String>,
    pub horizon_months: u32,
    /// Days from CE, see [`NaiveDate::num_days_from_ce`].
    pub training_cutoff: Option<i32>,
    pub n_train_rows: u64,
    pub threshold_high: f64,
    pub threshold_moderate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessorSchema {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub departments: Vec<String>,
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSchema {
    pub base_score: f32,
    pub trees: Vec<TreeSchema>,
}

/// SoA tree arrays, one entry per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSchema {
    pub split_feature: Vec<u32>,
    pub threshold: Vec<f64>,
    pub left: Vec<u32>,
    pub right: Vec<u32>,
    pub is_leaf: Vec<bool>,
    pub leaf_value: Vec<f32>,
    pub gain: Vec<f32>,
    pub cover: Vec<f32>,
}

// =============================================================================
// Runtime -> schema
// =============================================================================

impl From<&Tree> for TreeSchema {
    fn from(tree: &Tree) -> Self {
        let (split_feature, threshold, left, right, is_leaf, leaf_value, gain, cover) =
            tree.parts();
        Self {
            split_feature: split_feature.to_vec(),
            threshold: threshold.to_vec(),
            left: left.to_vec(),
            right: right.to_vec(),
            is_leaf: is_leaf.to_vec(),
            leaf_value: leaf_value.to_vec(),
            gain: gain.to_vec(),
            cover: cover.to_vec(),
        }
    }
}

impl From<&RetentionModel> for PayloadV1 {
    fn from(model: &RetentionModel) -> Self {
        let meta = model.meta();
        let pre = model.preprocessor();
        Self {
            meta: ModelMetaSchema {
                feature_names: meta.feature_names.clone(),
                horizon_months: meta.horizon_months,
                training_cutoff: meta.training_cutoff.map(|d| d.num_days_from_ce()),
                n_train_rows: meta.n_train_rows as u64,
                threshold_high: meta.thresholds.high,
                threshold_moderate: meta.thresholds.moderate,
            },
            preprocessor: PreprocessorSchema {
                means: pre.scaler.means.clone(),
                scales: pre.scaler.scales.clone(),
                departments: pre.department.categories().to_vec(),
                levels: pre.level.categories().to_vec(),
            },
            forest: ForestSchema {
                base_score: model.forest().base_score(),
                trees: model.forest().trees().map(TreeSchema::from).collect(),
            },
        }
    }
}

// =============================================================================
// Schema -> runtime
// =============================================================================

impl TryFrom<PayloadV1> for RetentionModel {
    type Error = ArtifactError;

    /// Rebuild and validate. Structural problems surface as
    /// [`ArtifactError::Corrupt`] rather than as panics at scoring time.
    fn try_from(payload: PayloadV1) -> Result<Self, Self::Error> {
        let PayloadV1 {
            meta,
            preprocessor,
            forest,
        } = payload;

        if meta.feature_names.len() != N_FEATURES {
            return Err(ArtifactError::Corrupt(format!(
                "expected {N_FEATURES} feature names, found {}",
                meta.feature_names.len()
            )));
        }
        let training_cutoff = match meta.training_cutoff {
            Some(days) => Some(NaiveDate::from_num_days_from_ce_opt(days).ok_or_else(|| {
                ArtifactError::Corrupt(format!("invalid training cutoff {days}"))
            })?),
            None => None,
        };
        let thresholds = RiskThresholds {
            high: meta.threshold_high,
            moderate: meta.threshold_moderate,
        };
        thresholds
            .validate()
            .map_err(|e| ArtifactError::Corrupt(e.to_string()))?;

        let PreprocessorSchema {
            means,
            scales,
            departments,
            levels,
        } = preprocessor;
        if means.len() != N_CONTINUOUS || scales.len() != N_CONTINUOUS {
            return Err(ArtifactError::Corrupt("scaler column count mismatch".into()));
        }
        let scales_ok = scales.iter().all(|s| s.is_finite() && *s > 0.0);
        if !means.iter().all(|m| m.is_finite()) || !scales_ok {
            return Err(ArtifactError::Corrupt(
                "non-finite or non-positive scaler values".into(),
            ));
        }
        if departments.is_empty() || levels.is_empty() {
            return Err(ArtifactError::Corrupt("empty category mapping".into()));
        }
        let preprocessor = Preprocessor {
            scaler: StandardScaler { means, scales },
            department: CategoryEncoder::from_categories(departments),
            level: CategoryEncoder::from_categories(levels),
        };

        let mut runtime_forest = Forest::new(forest.base_score);
        for t in forest.trees {
            runtime_forest.push_tree(Tree::from_parts(
                t.split_feature,
                t.threshold,
                t.left,
                t.right,
                t.is_leaf,
                t.leaf_value,
                t.gain,
                t.cover,
            ));
        }
        runtime_forest
            .validate(N_FEATURES)
            .map_err(|e| ArtifactError::Corrupt(e.to_string()))?;

        let meta = ModelMeta {
            feature_names: meta.feature_names,
            horizon_months: meta.horizon_months,
            training_cutoff,
            n_train_rows: meta.n_train_rows as usize,
            thresholds,
        };
        Ok(RetentionModel::new(preprocessor, runtime_forest, meta))
    }
}
