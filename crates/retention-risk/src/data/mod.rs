//! Population data: raw ingest, derivation, quality checks, caching and the
//! chronological split.
//!
//! The flow is `RawRecord` (CSV or code) → [`check_and_dedup`] →
//! [`derive_features`] → [`EmployeeSnapshot`] → [`chronological_split`].

mod cache;
mod derive;
mod quality;
mod raw;
mod snapshot;
mod split;

pub use cache::{DatasetKey, FeatureCache};
pub use derive::{
    demo_departure_risk, derive_features, DerivationMode, DerivationReport, DerivedPopulation,
    DeriveOptions, DEMO_DEPARTMENTS, DEMO_LEVELS, SYNTHETIC_ID_PREFIX,
};
pub use quality::{
    check_and_dedup, dedup_records, missing_fractions, DataQualityWarning, QualityPolicy,
};
pub use raw::{read_raw_csv, read_raw_csv_from, write_snapshots_csv, RawRecord};
pub use snapshot::{leaves_within_horizon, tenure_months, EmployeeSnapshot, DAYS_PER_MONTH};
pub use split::{chronological_split, date_quantile, sort_chronologically, TemporalSplit};
