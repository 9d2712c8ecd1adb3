//! Error taxonomy.
//!
//! Errors are grouped by remediation rather than by module:
//!
//! - [`ConfigError`]: the run is misconfigured (missing input, degenerate
//!   split, invalid parameters). Fix the configuration.
//! - [`InputError`]: a scoring record does not match the trained schema.
//!   Fix the record.
//! - [`DataError`]: the population itself cannot be used (parse failures,
//!   missing fields in strict mode). Fix the data.
//! - [`ArtifactError`]: the model or report could not be written or read.
//!   Check disk space, permissions, or the file itself.
//!
//! Leakage and data-quality signals are *not* errors; see
//! [`crate::leakage::LeakageWarning`] and [`crate::data::DataQualityWarning`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::leakage::LeakageWarning;

/// Crate-level result alias.
pub type Result<T, E = RetentionError> = std::result::Result<T, E>;

/// Top-level error returned by pipeline operations.
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid scoring input: {0}")]
    Input(#[from] InputError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("model artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// The caller asked to abort on leakage warnings and some were raised.
    #[error("training aborted: {} leakage warning(s) raised", warnings.len())]
    LeakageAbort { warnings: Vec<LeakageWarning> },
}

// =============================================================================
// ConfigError
// =============================================================================

/// Fatal configuration problems. Never retried automatically.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("degenerate chronological split: {0}")]
    DegenerateSplit(String),

    #[error("invalid parameter `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// InputError
// =============================================================================

/// Scoring-time validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("required feature `{0}` is missing")]
    MissingFeature(&'static str),

    #[error("feature `{feature}` has unseen category {value:?} (known: {known:?})")]
    UnseenCategory {
        feature: &'static str,
        value: String,
        known: Vec<String>,
    },

    #[error("feature `{feature}` is not finite: {value}")]
    NonFinite { feature: &'static str, value: f64 },

    #[error("malformed record: {0}")]
    Malformed(String),
}

// =============================================================================
// DataError
// =============================================================================

/// Problems with the population being derived or trained on.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: missing required field `{field}` (strict derivation)")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid value for `{field}`: {reason}")]
    InvalidValue {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("population is empty")]
    Empty,

    #[error("training labels contain a single class ({positives} positive of {total})")]
    SingleClass { positives: usize, total: usize },
}

// =============================================================================
// ArtifactError
// =============================================================================

/// Model and report persistence failures.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a retention model file")]
    NotAModel,

    #[error("model format {major}.{minor} is newer than supported")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("corrupt payload: {0}")]
    Corrupt(String),
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
