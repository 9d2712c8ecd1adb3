//! Training infrastructure for gradient boosting.
//!
//! - [`LogisticLoss`], [`GradsTuple`]: binary cross-entropy gradients
//! - [`MetricFn`] with [`Auc`], [`Accuracy`], [`F1`], [`LogLoss`]
//! - [`BinnedMatrix`], [`BinMapper`]: feature quantization
//! - [`GainParams`] and the histogram split finder
//! - [`TreeGrower`]: depth-wise histogram tree growth
//! - [`GBDTTrainer`], [`GBDTParams`]: the boosting loop
//! - [`time_series_folds`]: chronological CV folds
//! - [`TrainingLogger`], [`Verbosity`]: progress logging

mod binning;
mod cv;
mod grower;
mod logger;
mod metrics;
mod objective;
pub mod sampling;
mod split;
mod trainer;

pub use binning::{BinMapper, BinnedMatrix, MAX_BINS};
pub use cv::{time_series_folds, TimeSeriesFold, MIN_FOLD_ROWS};
pub use grower::{GrowerParams, TreeGrower};
pub use logger::{TrainingLogger, Verbosity};
pub use metrics::{Accuracy, Auc, LogLoss, MetricFn, DEFAULT_THRESHOLD, F1};
pub use objective::{GradsTuple, LogisticLoss};
pub use split::{GainParams, NodeStats, SplitInfo};
pub use trainer::{GBDTParams, GBDTTrainer};
