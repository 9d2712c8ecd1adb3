//! Raw population records and delimited-text ingest.
//!
//! A [`RawRecord`] is whatever the source export provides: every field is
//! optional, columns may be missing entirely, and a couple of legacy column
//! names are accepted as aliases. [`crate::data::derive_features`] turns raw
//! records into complete [`EmployeeSnapshot`]s.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::snapshot::EmployeeSnapshot;
use crate::error::{ConfigError, DataError, Result};

/// One row of a raw population export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub employee_id: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub snapshot_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
    pub salary_vs_market: Option<f64>,
    pub days_since_promotion: Option<f64>,
    pub manager_tenure_months: Option<f64>,
    pub team_size: Option<f64>,
    #[serde(deserialize_with = "non_empty_string")]
    pub department: Option<String>,
    #[serde(deserialize_with = "non_empty_string")]
    pub level: Option<String>,
    #[serde(alias = "Is_Neurodivergent", deserialize_with = "flexible_bool")]
    pub is_neurodivergent: Option<bool>,
    #[serde(alias = "will_leave_6m", deserialize_with = "flexible_bool")]
    pub will_leave_within_horizon: Option<bool>,
}

impl RawRecord {
    /// Column names, in export order.
    pub const COLUMNS: [&'static str; 12] = [
        "employee_id",
        "hire_date",
        "snapshot_date",
        "termination_date",
        "salary_vs_market",
        "days_since_promotion",
        "manager_tenure_months",
        "team_size",
        "department",
        "level",
        "is_neurodivergent",
        "will_leave_within_horizon",
    ];

    /// Per-column presence flags, aligned with [`Self::COLUMNS`].
    ///
    /// `termination_date` is legitimately absent for employees who have not
    /// left, so it always reports present.
    pub fn presence(&self) -> [bool; 12] {
        [
            self.employee_id.is_some(),
            self.hire_date.is_some(),
            self.snapshot_date.is_some(),
            true,
            self.salary_vs_market.is_some(),
            self.days_since_promotion.is_some(),
            self.manager_tenure_months.is_some(),
            self.team_size.is_some(),
            self.department.is_some(),
            self.level.is_some(),
            self.is_neurodivergent.is_some(),
            self.will_leave_within_horizon.is_some() || self.termination_date.is_some(),
        ]
    }

    /// Hashable identity used for duplicate detection.
    pub(crate) fn dedup_key(&self) -> RecordKey {
        let bits = |v: Option<f64>| v.map(f64::to_bits);
        RecordKey {
            employee_id: self.employee_id.clone(),
            dates: [self.hire_date, self.snapshot_date, self.termination_date],
            numerics: [
                bits(self.salary_vs_market),
                bits(self.days_since_promotion),
                bits(self.manager_tenure_months),
                bits(self.team_size),
            ],
            department: self.department.clone(),
            level: self.level.clone(),
            flags: [self.is_neurodivergent, self.will_leave_within_horizon],
        }
    }
}

impl From<&EmployeeSnapshot> for RawRecord {
    fn from(s: &EmployeeSnapshot) -> Self {
        Self {
            employee_id: Some(s.employee_id.clone()),
            hire_date: Some(s.hire_date),
            snapshot_date: Some(s.snapshot_date),
            termination_date: s.termination_date,
            salary_vs_market: Some(s.salary_vs_market),
            days_since_promotion: Some(s.days_since_promotion),
            manager_tenure_months: Some(s.manager_tenure_months),
            team_size: Some(s.team_size),
            department: Some(s.department.clone()),
            level: Some(s.level.clone()),
            is_neurodivergent: Some(s.is_neurodivergent),
            will_leave_within_horizon: Some(s.will_leave_within_horizon),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RecordKey {
    employee_id: Option<String>,
    dates: [Option<NaiveDate>; 3],
    numerics: [Option<u64>; 4],
    department: Option<String>,
    level: Option<String>,
    flags: [Option<bool>; 2],
}

// =============================================================================
// Field Deserializers
// =============================================================================

fn non_empty_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    let Some(raw) = value else { return Ok(None) };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "y" => Ok(Some(true)),
        "0" | "false" | "no" | "n" => Ok(Some(false)),
        other => Err(serde::de::Error::custom(format!("invalid boolean {other:?}"))),
    }
}

// =============================================================================
// CSV I/O
// =============================================================================

/// Read raw records from a CSV file with a header row.
///
/// A missing file is a configuration error, not a data error: the run was
/// pointed at the wrong place.
pub fn read_raw_csv(path: &Path) -> Result<Vec<RawRecord>> {
    if !path.exists() {
        return Err(ConfigError::MissingInput(path.to_path_buf()).into());
    }
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(read_raw_csv_from(file)?)
}

/// Read raw records from any reader producing CSV with a header row.
pub fn read_raw_csv_from<R: Read>(reader: R) -> Result<Vec<RawRecord>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);
    let records = csv_reader
        .deserialize::<RawRecord>()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
    Ok(records)
}

/// Write snapshots as CSV (the same columns [`read_raw_csv`] accepts).
pub fn write_snapshots_csv<W: Write>(
    writer: W,
    snapshots: &[EmployeeSnapshot],
) -> Result<(), DataError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for snapshot in snapshots {
        csv_writer.serialize(RawRecord::from(snapshot))?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
