//! Synthetic populations for tests and benchmarks.
//!
//! Nothing here is used by the training pipeline itself.

mod population;

pub use population::{synthetic_population, synthetic_raw_records, synthetic_risk};
