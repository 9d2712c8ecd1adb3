//! Feature derivation: raw records → complete snapshots.
//!
//! Two modes:
//!
//! - [`DerivationMode::Strict`]: every field must be present. Nothing is
//!   invented. Use this for real exports.
//! - [`DerivationMode::Demo`]: missing fields are filled from explicit
//!   placeholder distributions. Every synthesized value is counted in the
//!   [`DerivationReport`] so demo output can never pass for real data.
//!
//! Randomness is fully determined by [`DeriveOptions::seed`]. Each record
//! draws from its own generator seeded by `(seed, row)`, and always draws the
//! same sequence regardless of which fields are present, so the synthesized
//! value of one field never depends on whether another field was present.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::raw::RawRecord;
use super::snapshot::{leaves_within_horizon, tenure_months, EmployeeSnapshot};
use crate::error::DataError;

/// Departments used by demo synthesis.
pub const DEMO_DEPARTMENTS: [&str; 5] = ["Engineering", "Art", "Design", "QA", "Production"];
/// Levels used by demo synthesis.
pub const DEMO_LEVELS: [&str; 4] = ["Junior", "Senior", "Lead", "Principal"];
/// Employee id prefix of generated populations. Records carrying it count as
/// demo data even when every field is present.
pub const SYNTHETIC_ID_PREFIX: &str = "SYN-";

// =============================================================================
// Options
// =============================================================================

/// How to treat missing fields.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DerivationMode {
    /// Missing fields are errors.
    #[default]
    Strict,
    /// Missing fields are synthesized (demo data only).
    Demo,
}

/// Options for [`derive_features`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeriveOptions {
    pub mode: DerivationMode,
    pub seed: u64,
    /// Label horizon in months, used when the label comes from a termination date.
    pub horizon_months: u32,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            mode: DerivationMode::Strict,
            seed: 42,
            horizon_months: 6,
        }
    }
}

impl DeriveOptions {
    pub fn demo(seed: u64) -> Self {
        Self {
            mode: DerivationMode::Demo,
            seed,
            ..Self::default()
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// What derivation had to invent or drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivationReport {
    /// Synthesized value counts per field.
    pub synthesized: BTreeMap<String, usize>,
    /// Records excluded because they departed on or before their snapshot.
    pub departed_before_snapshot: usize,
    /// Emitted records whose id carries [`SYNTHETIC_ID_PREFIX`].
    pub synthetic_records: usize,
}

impl DerivationReport {
    /// Total number of synthesized values.
    pub fn synthesized_values(&self) -> usize {
        self.synthesized.values().sum()
    }

    /// True when any value was synthesized or any record was generated.
    pub fn is_demo_data(&self) -> bool {
        self.synthesized_values() > 0 || self.synthetic_records > 0
    }

    fn note(&mut self, field: &'static str) {
        *self.synthesized.entry(field.to_string()).or_default() += 1;
    }
}

/// Output of [`derive_features`].
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedPopulation {
    pub snapshots: Vec<EmployeeSnapshot>,
    pub report: DerivationReport,
}

impl DerivedPopulation {
    pub fn is_demo_data(&self) -> bool {
        self.report.is_demo_data()
    }
}

// =============================================================================
// Derivation
// =============================================================================

/// Per-record placeholder draws. Drawn unconditionally, used only for
/// missing fields.
struct Placeholders {
    snapshot_offset_days: u64,
    salary_vs_market: f64,
    days_since_promotion: f64,
    manager_tenure_months: f64,
    team_size: f64,
    department: &'static str,
    level: &'static str,
    is_neurodivergent: bool,
    label_draw: f64,
}

impl Placeholders {
    fn draw(rng: &mut Xoshiro256PlusPlus) -> Self {
        Self {
            snapshot_offset_days: rng.gen_range(30..1095),
            salary_vs_market: rng.gen_range(0.8..1.4),
            days_since_promotion: rng.gen_range(0..1095) as f64,
            manager_tenure_months: rng.gen_range(6..84) as f64,
            team_size: rng.gen_range(3..20) as f64,
            department: DEMO_DEPARTMENTS[rng.gen_range(0..DEMO_DEPARTMENTS.len())],
            level: DEMO_LEVELS[rng.gen_range(0..DEMO_LEVELS.len())],
            is_neurodivergent: rng.gen_bool(0.12),
            label_draw: rng.gen::<f64>(),
        }
    }
}

/// Departure probability used to synthesize demo labels.
///
/// Short tenure and below-market pay raise risk; the neurodivergent factor
/// lowers it. Capped at 0.4.
pub fn demo_departure_risk(
    tenure_months: f64,
    salary_vs_market: f64,
    is_neurodivergent: bool,
) -> f64 {
    const BASE_RISK: f64 = 0.15;
    let tenure_factor = if tenure_months < 12.0 {
        1.8
    } else if tenure_months < 36.0 {
        1.2
    } else {
        0.7
    };
    let salary_factor = if salary_vs_market < 0.9 { 1.5 } else { 0.8 };
    let neuro_factor = if is_neurodivergent { 0.7 } else { 1.0 };
    (BASE_RISK * tenure_factor * salary_factor * neuro_factor).clamp(0.0, 0.4)
}

fn record_rng(seed: u64, row: usize) -> Xoshiro256PlusPlus {
    let mixed = seed ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Xoshiro256PlusPlus::seed_from_u64(mixed)
}

fn demo_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

/// Turn raw records into complete, leakage-safe snapshots.
///
/// # Errors
///
/// - [`DataError::MissingField`] in strict mode when a required field is absent.
/// - [`DataError::InvalidValue`] for out-of-range values (non-positive salary
///   ratio, negative durations, team size below 1).
pub fn derive_features(
    raw: &[RawRecord],
    options: &DeriveOptions,
) -> Result<DerivedPopulation, DataError> {
    let demo = options.mode == DerivationMode::Demo;
    let mut report = DerivationReport::default();
    let mut snapshots = Vec::with_capacity(raw.len());

    // Hire dates are synthesized as a walk with one population-wide step.
    let hire_step_days = Xoshiro256PlusPlus::seed_from_u64(options.seed).gen_range(1..30u64);

    for (row, record) in raw.iter().enumerate() {
        let ph = Placeholders::draw(&mut record_rng(options.seed, row));

        // Fills a missing field from the placeholder in demo mode, or fails.
        macro_rules! resolve {
            ($field:ident, $placeholder:expr) => {
                match record.$field.clone() {
                    Some(v) => v,
                    None if demo => {
                        report.note(stringify!($field));
                        $placeholder
                    }
                    None => {
                        return Err(DataError::MissingField {
                            row,
                            field: stringify!($field),
                        })
                    }
                }
            };
        }

        let employee_id = resolve!(employee_id, format!("EMP-{row:05}"));
        let hire_date = resolve!(
            hire_date,
            demo_epoch()
                .checked_add_days(Days::new(row as u64 * hire_step_days))
                .unwrap_or(NaiveDate::MAX)
        );
        let snapshot_date = resolve!(
            snapshot_date,
            hire_date
                .checked_add_days(Days::new(ph.snapshot_offset_days))
                .unwrap_or(NaiveDate::MAX)
        );
        let salary_vs_market = resolve!(salary_vs_market, ph.salary_vs_market);
        let days_since_promotion = resolve!(days_since_promotion, ph.days_since_promotion);
        let manager_tenure_months = resolve!(manager_tenure_months, ph.manager_tenure_months);
        let team_size = resolve!(team_size, ph.team_size);
        let department = resolve!(department, ph.department.to_string());
        let level = resolve!(level, ph.level.to_string());
        let is_neurodivergent = resolve!(is_neurodivergent, ph.is_neurodivergent);

        check_range(row, "salary_vs_market", salary_vs_market, |v| v > 0.0)?;
        check_range(row, "days_since_promotion", days_since_promotion, |v| v >= 0.0)?;
        check_range(row, "manager_tenure_months", manager_tenure_months, |v| v >= 0.0)?;
        check_range(row, "team_size", team_size, |v| v >= 1.0)?;

        if let Some(term) = record.termination_date {
            if term <= snapshot_date {
                report.departed_before_snapshot += 1;
                continue;
            }
        }

        if employee_id.starts_with(SYNTHETIC_ID_PREFIX) {
            report.synthetic_records += 1;
        }
        let tenure = tenure_months(hire_date, snapshot_date);

        let label = match (record.will_leave_within_horizon, record.termination_date) {
            (Some(label), _) => label,
            (None, Some(term)) => {
                leaves_within_horizon(snapshot_date, term, options.horizon_months)
            }
            (None, None) if demo => {
                report.note("will_leave_within_horizon");
                ph.label_draw < demo_departure_risk(tenure, salary_vs_market, is_neurodivergent)
            }
            (None, None) => {
                return Err(DataError::MissingField {
                    row,
                    field: "will_leave_within_horizon",
                });
            }
        };

        snapshots.push(EmployeeSnapshot {
            employee_id,
            hire_date,
            snapshot_date,
            tenure_months: tenure,
            salary_vs_market,
            days_since_promotion,
            manager_tenure_months,
            team_size,
            department,
            level,
            is_neurodivergent,
            termination_date: record.termination_date,
            will_leave_within_horizon: label,
        });
    }

    Ok(DerivedPopulation { snapshots, report })
}

fn check_range(
    row: usize,
    field: &'static str,
    value: f64,
    ok: impl Fn(f64) -> bool,
) -> Result<(), DataError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(DataError::InvalidValue {
            row,
            field,
            reason: format!("out of range: {value}"),
        })
    }
}
