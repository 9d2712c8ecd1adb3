//! Safe features and their preprocessing.

mod preprocess;
mod schema;

pub use preprocess::{CategoryEncoder, Preprocessor, StandardScaler};
pub use schema::{
    feature_names, FeatureKind, FeatureSpec, SafeFeatures, ScoringRecord, DEPARTMENT_COLUMN,
    LEVEL_COLUMN, N_CONTINUOUS, N_FEATURES, SAFE_FEATURES,
};
