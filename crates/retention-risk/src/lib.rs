//! retention-risk: leakage-aware temporal retention-risk estimation.
//!
//! Given time-stamped employee snapshots, trains a gradient-boosted tree
//! ensemble estimating the probability that an employee leaves within a
//! horizon (6 months by default). Validation is strictly chronological, so the
//! model is only ever evaluated on snapshots from after its training data.
//!
//! # Key Types
//!
//! - [`TrainingPipeline`] / [`RetentionConfig`] - end-to-end training from a
//!   TOML configuration
//! - [`RetentionModel`] - immutable fitted model with what-if scoring
//! - [`BoostingConfig`] - classifier hyperparameters (builder)
//! - [`EvaluationReport`] - holdout metrics, CV statistics and warnings
//! - [`RetentionError`] - error taxonomy
//!
//! # Scoring
//!
//! ```no_run
//! use std::path::Path;
//! use retention_risk::{persist, ScoringRecord};
//!
//! let model = persist::load_model(Path::new("model.rrsk"))?;
//! let record: ScoringRecord = serde_json::from_str(
//!     r#"{"tenure_months": 8, "salary_vs_market": 0.85, "days_since_promotion": 400,
//!         "manager_tenure_months": 10, "team_size": 12, "is_neurodivergent": false,
//!         "department": "Art", "level": "Junior"}"#,
//! )?;
//! println!("{}", model.score(&record)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod leakage;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod report;
pub mod repr;
pub mod testing;
pub mod tracking;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::RetentionConfig;
pub use error::{ArtifactError, ConfigError, DataError, InputError, Result, RetentionError};

pub use data::{
    chronological_split, derive_features, DerivationMode, DeriveOptions, EmployeeSnapshot,
    RawRecord,
};
pub use features::{SafeFeatures, ScoringRecord};
pub use leakage::{detect_leakage, LeakagePolicy, LeakageWarning};
pub use model::{
    BoostingConfig, ClassWeight, RetentionModel, RetentionTrainer, RiskBand, RiskScore,
    RiskThresholds,
};
pub use pipeline::{TrainingPipeline, TrainingRun};
pub use report::{CrossValidationReport, EvaluationReport, HoldoutMetrics};

pub use utils::{run_with_threads, Parallelism};
