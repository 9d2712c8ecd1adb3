//! The safe-feature schema.
//!
//! Only these eight features ever reach the model. Each is observable as of
//! the snapshot date; labels and termination dates are not in the list and
//! cannot be extracted through it.

use serde::{Deserialize, Serialize};

use crate::data::EmployeeSnapshot;
use crate::error::InputError;

/// How a feature is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Standardized with training mean/std.
    Continuous,
    /// Passed through as 0/1.
    Binary,
    /// Sorted code mapping fixed at training time.
    Categorical,
}

/// One feature of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
}

const fn spec(name: &'static str, kind: FeatureKind) -> FeatureSpec {
    FeatureSpec { name, kind }
}

/// Number of model features.
pub const N_FEATURES: usize = 8;

/// Model input columns, in matrix order.
pub const SAFE_FEATURES: [FeatureSpec; N_FEATURES] = [
    spec("tenure_months", FeatureKind::Continuous),
    spec("salary_vs_market", FeatureKind::Continuous),
    spec("days_since_promotion", FeatureKind::Continuous),
    spec("manager_tenure_months", FeatureKind::Continuous),
    spec("team_size", FeatureKind::Continuous),
    spec("is_neurodivergent", FeatureKind::Binary),
    spec("department", FeatureKind::Categorical),
    spec("level", FeatureKind::Categorical),
];

/// Column index of `department` in [`SAFE_FEATURES`].
pub const DEPARTMENT_COLUMN: usize = 6;
/// Column index of `level` in [`SAFE_FEATURES`].
pub const LEVEL_COLUMN: usize = 7;
/// Number of leading continuous columns.
pub const N_CONTINUOUS: usize = 5;

/// Feature names in matrix order.
pub fn feature_names() -> Vec<String> {
    SAFE_FEATURES.iter().map(|f| f.name.to_string()).collect()
}

// =============================================================================
// SafeFeatures
// =============================================================================

/// The complete, validated feature set for one employee at one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeFeatures {
    pub tenure_months: f64,
    pub salary_vs_market: f64,
    pub days_since_promotion: f64,
    pub manager_tenure_months: f64,
    pub team_size: f64,
    pub is_neurodivergent: bool,
    pub department: String,
    pub level: String,
}

impl SafeFeatures {
    /// Extract model features from a snapshot.
    ///
    /// Reads nothing dated after `snapshot_date`: the label and the
    /// termination date are never touched.
    pub fn from_snapshot(snapshot: &EmployeeSnapshot) -> Self {
        Self {
            tenure_months: snapshot.tenure_months,
            salary_vs_market: snapshot.salary_vs_market,
            days_since_promotion: snapshot.days_since_promotion,
            manager_tenure_months: snapshot.manager_tenure_months,
            team_size: snapshot.team_size,
            is_neurodivergent: snapshot.is_neurodivergent,
            department: snapshot.department.clone(),
            level: snapshot.level.clone(),
        }
    }

    /// The continuous columns, in schema order.
    #[inline]
    pub fn continuous(&self) -> [f64; N_CONTINUOUS] {
        [
            self.tenure_months,
            self.salary_vs_market,
            self.days_since_promotion,
            self.manager_tenure_months,
            self.team_size,
        ]
    }
}

// =============================================================================
// ScoringRecord
// =============================================================================

/// A what-if scoring request. Any field may be missing; [`Self::validate`]
/// rejects incomplete or non-finite records instead of filling them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringRecord {
    pub tenure_months: Option<f64>,
    pub salary_vs_market: Option<f64>,
    pub days_since_promotion: Option<f64>,
    pub manager_tenure_months: Option<f64>,
    pub team_size: Option<f64>,
    pub is_neurodivergent: Option<bool>,
    pub department: Option<String>,
    pub level: Option<String>,
}

impl ScoringRecord {
    /// Check completeness and finiteness.
    ///
    /// Category membership is checked later against the model's encoder.
    pub fn validate(&self) -> Result<SafeFeatures, InputError> {
        fn numeric(value: Option<f64>, feature: &'static str) -> Result<f64, InputError> {
            let value = value.ok_or(InputError::MissingFeature(feature))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(InputError::NonFinite { feature, value })
            }
        }
        fn category(value: &Option<String>, feature: &'static str) -> Result<String, InputError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or(InputError::MissingFeature(feature))
        }

        Ok(SafeFeatures {
            tenure_months: numeric(self.tenure_months, "tenure_months")?,
            salary_vs_market: numeric(self.salary_vs_market, "salary_vs_market")?,
            days_since_promotion: numeric(self.days_since_promotion, "days_since_promotion")?,
            manager_tenure_months: numeric(self.manager_tenure_months, "manager_tenure_months")?,
            team_size: numeric(self.team_size, "team_size")?,
            is_neurodivergent: self
                .is_neurodivergent
                .ok_or(InputError::MissingFeature("is_neurodivergent"))?,
            department: category(&self.department, "department")?,
            level: category(&self.level, "level")?,
        })
    }

    /// Set one field from `key=value` text.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), InputError> {
        let number = || {
            value
                .trim()
                .parse::<f64>()
                .map_err(|e| InputError::Malformed(format!("{key}: {e}")))
        };
        match key.trim() {
            "tenure_months" => self.tenure_months = Some(number()?),
            "salary_vs_market" => self.salary_vs_market = Some(number()?),
            "days_since_promotion" => self.days_since_promotion = Some(number()?),
            "manager_tenure_months" => self.manager_tenure_months = Some(number()?),
            "team_size" => self.team_size = Some(number()?),
            "is_neurodivergent" => {
                self.is_neurodivergent = Some(match value.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    other => {
                        return Err(InputError::Malformed(format!(
                            "{key}: invalid boolean {other:?}"
                        )))
                    }
                })
            }
            "department" => self.department = Some(value.trim().to_string()),
            "level" => self.level = Some(value.trim().to_string()),
            other => return Err(InputError::Malformed(format!("unknown feature `{other}`"))),
        }
        Ok(())
    }
}

impl From<&SafeFeatures> for ScoringRecord {
    fn from(f: &SafeFeatures) -> Self {
        Self {
            tenure_months: Some(f.tenure_months),
            salary_vs_market: Some(f.salary_vs_market),
            days_since_promotion: Some(f.days_since_promotion),
            manager_tenure_months: Some(f.manager_tenure_months),
            team_size: Some(f.team_size),
            is_neurodivergent: Some(f.is_neurodivergent),
            department: Some(f.department.clone()),
            level: Some(f.level.clone()),
        }
    }
}

impl From<&EmployeeSnapshot> for ScoringRecord {
    fn from(s: &EmployeeSnapshot) -> Self {
        Self::from(&SafeFeatures::from_snapshot(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> ScoringRecord {
        ScoringRecord {
            tenure_months: Some(14.0),
            salary_vs_market: Some(0.95),
            days_since_promotion: Some(300.0),
            manager_tenure_months: Some(20.0),
            team_size: Some(7.0),
            is_neurodivergent: Some(true),
            department: Some("Engineering".into()),
            level: Some("Senior".into()),
        }
    }

    #[test]
    fn schema_columns_line_up() {
        assert_eq!(SAFE_FEATURES[DEPARTMENT_COLUMN].name, "department");
        assert_eq!(SAFE_FEATURES[LEVEL_COLUMN].name, "level");
        assert!(SAFE_FEATURES[..N_CONTINUOUS].iter().all(|f| f.kind == FeatureKind::Continuous));
        assert!(!feature_names().iter().any(|n| n.contains("leave") || n.contains("termination")));
    }

    #[test]
    fn validate_reports_first_missing_feature() {
        let mut r = full();
        r.team_size = None;
        assert_eq!(r.validate(), Err(InputError::MissingFeature("team_size")));

        let mut r = full();
        r.level = Some("   ".into());
        assert_eq!(r.validate(), Err(InputError::MissingFeature("level")));
    }

    #[test]
    fn validate_rejects_non_finite() {
        let mut r = full();
        r.salary_vs_market = Some(f64::INFINITY);
        assert!(matches!(
            r.validate(),
            Err(InputError::NonFinite { feature: "salary_vs_market", .. })
        ));
    }

    #[test]
    fn set_field_parses_cli_pairs() {
        let mut r = ScoringRecord::default();
        r.set_field("team_size", " 9 ").unwrap();
        r.set_field("is_neurodivergent", "yes").unwrap();
        r.set_field("department", "QA").unwrap();
        assert_eq!(r.team_size, Some(9.0));
        assert_eq!(r.is_neurodivergent, Some(true));
        assert_eq!(r.department.as_deref(), Some("QA"));
        assert!(matches!(r.set_field("salary", "1"), Err(InputError::Malformed(_))));
        assert!(matches!(r.set_field("team_size", "many"), Err(InputError::Malformed(_))));
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let err = serde_json::from_str::<ScoringRecord>(r#"{"will_leave_within_horizon": true}"#);
        assert!(err.is_err());
        let ok: ScoringRecord = serde_json::from_str(r#"{"team_size": 4}"#).unwrap();
        assert_eq!(ok.team_size, Some(4.0));
    }
}
