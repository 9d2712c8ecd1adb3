//! High-level retention model.
//!
//! - [`BoostingConfig`]: classifier hyperparameters (bon builder)
//! - [`RetentionTrainer`]: cross-validation plus final refit
//! - [`RetentionModel`]: immutable fitted model, scoring and importance
//! - [`RiskThresholds`], [`RiskBand`], [`RiskScore`]: qualitative bands

mod config;
mod meta;
mod retention;
mod risk;
mod trainer;

pub use config::{BoostingConfig, BoostingConfigBuilder, ClassWeight};
pub use meta::ModelMeta;
pub use retention::{FeatureImportance, ImportanceType, RetentionModel};
pub use risk::{RiskBand, RiskScore, RiskThresholds};
pub use trainer::RetentionTrainer;
