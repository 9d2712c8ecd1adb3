//! Data-quality checks on raw populations.
//!
//! These are advisories: they are collected into the evaluation report and
//! logged, and training proceeds.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::raw::RawRecord;

/// Thresholds for raw-data quality checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    /// Report a column when more than this fraction of its values is missing.
    pub max_missing_fraction: f64,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            max_missing_fraction: 0.2,
        }
    }
}

/// A non-fatal data-quality signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Exact duplicate rows were dropped (first occurrence kept).
    DuplicateRows { removed: usize },
    /// A column is missing more often than the policy allows.
    HighMissingFraction { column: String, fraction: f64 },
    /// Rows whose termination date is on or before the snapshot date.
    DepartedBeforeSnapshot { rows: usize },
    /// Some values were synthesized by demo derivation, or some records came
    /// from a generated population.
    DemoData {
        synthesized_values: usize,
        synthetic_records: usize,
    },
    /// Evaluation rows dropped because a category never appeared in training.
    UnseenCategoryInTest {
        feature: String,
        value: String,
        rows: usize,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRows { removed } => write!(f, "{removed} duplicate row(s) removed"),
            Self::HighMissingFraction { column, fraction } => {
                write!(f, "column `{column}` is {:.1}% missing", fraction * 100.0)
            }
            Self::DepartedBeforeSnapshot { rows } => {
                write!(f, "{rows} row(s) departed on or before their snapshot date (excluded)")
            }
            Self::DemoData {
                synthesized_values,
                synthetic_records,
            } => write!(
                f,
                "DEMO DATA: {synthesized_values} value(s) synthesized, {synthetic_records} \
                 generated record(s); metrics are not a real validation"
            ),
            Self::UnseenCategoryInTest { feature, value, rows } => write!(
                f,
                "{rows} evaluation row(s) with unseen {feature} {value:?} excluded"
            ),
        }
    }
}

/// Drop exact duplicate records, keeping the first occurrence.
///
/// Returns the deduplicated records and the number removed.
pub fn dedup_records(records: Vec<RawRecord>) -> (Vec<RawRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<RawRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Per-column missing fractions, aligned with [`RawRecord::COLUMNS`].
pub fn missing_fractions(records: &[RawRecord]) -> Vec<(&'static str, f64)> {
    let mut missing = [0usize; RawRecord::COLUMNS.len()];
    for record in records {
        for (count, present) in missing.iter_mut().zip(record.presence()) {
            if !present {
                *count += 1;
            }
        }
    }
    let n = records.len().max(1) as f64;
    RawRecord::COLUMNS
        .iter()
        .zip(missing)
        .map(|(&col, count)| (col, count as f64 / n))
        .collect()
}

/// Deduplicate and assess a raw population.
pub fn check_and_dedup(
    records: Vec<RawRecord>,
    policy: &QualityPolicy,
) -> (Vec<RawRecord>, Vec<DataQualityWarning>) {
    let mut warnings = Vec::new();

    let (records, removed) = dedup_records(records);
    if removed > 0 {
        warnings.push(DataQualityWarning::DuplicateRows { removed });
    }

    if !records.is_empty() {
        warnings.extend(
            missing_fractions(&records)
                .into_iter()
                .filter(|&(_, fraction)| fraction > policy.max_missing_fraction)
                .map(|(column, fraction)| DataQualityWarning::HighMissingFraction {
                    column: column.to_string(),
                    fraction,
                }),
        );
    }

    (records, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, dept: Option<&str>) -> RawRecord {
        RawRecord {
            employee_id: Some(id.into()),
            department: dept.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn removes_exact_duplicates_only() {
        let records = vec![
            record("1", Some("Art")),
            record("1", Some("Art")),
            record("2", Some("Art")),
            record("1", Some("QA")),
        ];
        let (kept, removed) = dedup_records(records);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0], record("1", Some("Art")));
    }

    #[test]
    fn flags_columns_over_missing_threshold() {
        let records = vec![
            record("1", Some("Art")),
            record("2", None),
            record("3", Some("QA")),
            record("4", Some("QA")),
        ];
        let policy = QualityPolicy {
            max_missing_fraction: 0.5,
        };
        let (_, warnings) = check_and_dedup(records, &policy);

        // department is 25% missing: under the threshold
        assert!(!warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::HighMissingFraction { column, .. } if column == "department"
        )));
        // hire_date is entirely missing
        assert!(warnings.contains(&DataQualityWarning::HighMissingFraction {
            column: "hire_date".into(),
            fraction: 1.0,
        }));
        // termination_date is never reported
        assert!(!warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::HighMissingFraction { column, .. } if column == "termination_date"
        )));
    }

    #[test]
    fn empty_population_has_no_warnings() {
        let (kept, warnings) = check_and_dedup(Vec::new(), &QualityPolicy::default());
        assert!(kept.is_empty());
        assert!(warnings.is_empty());
    }
}
