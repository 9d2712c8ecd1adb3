//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use retention_risk::model::BoostingConfig;
use retention_risk::testing::{synthetic_population, synthetic_raw_records};
use retention_risk::training::Verbosity;
use retention_risk::{EmployeeSnapshot, RawRecord, RetentionConfig};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2022-01-01 ..= 2023-12-31.
pub fn study_window() -> (NaiveDate, NaiveDate) {
    (date(2022, 1, 1), date(2023, 12, 31))
}

pub fn population(n: usize, seed: u64) -> Vec<EmployeeSnapshot> {
    let (start, end) = study_window();
    synthetic_population(n, start, end, seed)
}

pub fn raw_population(n: usize, seed: u64) -> Vec<RawRecord> {
    let (start, end) = study_window();
    synthetic_raw_records(n, start, end, seed)
}

/// Small, single-threaded, quiet model config.
pub fn fast_model(n_trees: u32) -> BoostingConfig {
    BoostingConfig::builder()
        .n_trees(n_trees)
        .max_depth(3)
        .n_threads(1)
        .verbosity(Verbosity::Silent)
        .build()
        .unwrap()
}

pub fn fast_config(n_trees: u32) -> RetentionConfig {
    RetentionConfig {
        model: fast_model(n_trees),
        ..RetentionConfig::default()
    }
}
