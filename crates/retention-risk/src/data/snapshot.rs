//! Employee snapshot model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Days per month used to convert day spans into tenure months.
pub const DAYS_PER_MONTH: f64 = 30.44;

/// One employee observed at one date.
///
/// Everything except [`termination_date`](Self::termination_date) and
/// [`will_leave_within_horizon`](Self::will_leave_within_horizon) is known as of
/// `snapshot_date`. Those two fields look forward and must never reach the
/// feature vector; see [`crate::features::SafeFeatures::from_snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSnapshot {
    pub employee_id: String,
    pub hire_date: NaiveDate,
    pub snapshot_date: NaiveDate,
    /// Derived from `hire_date` and `snapshot_date`, see [`tenure_months`].
    pub tenure_months: f64,
    pub salary_vs_market: f64,
    pub days_since_promotion: f64,
    pub manager_tenure_months: f64,
    pub team_size: f64,
    pub department: String,
    pub level: String,
    pub is_neurodivergent: bool,
    /// Recorded departure date, when known. Post-snapshot information.
    pub termination_date: Option<NaiveDate>,
    /// Label: left within the horizon after `snapshot_date`.
    pub will_leave_within_horizon: bool,
}

impl EmployeeSnapshot {
    /// Label as a 0/1 float.
    #[inline]
    pub fn label_f32(&self) -> f32 {
        if self.will_leave_within_horizon { 1.0 } else { 0.0 }
    }
}

/// Tenure in 30.44-day months between `hire` and `snapshot`, floored at 0.
pub fn tenure_months(hire: NaiveDate, snapshot: NaiveDate) -> f64 {
    let days = snapshot.signed_duration_since(hire).num_days();
    (days as f64 / DAYS_PER_MONTH).max(0.0)
}

/// Whether a departure on `termination` falls inside `(snapshot, snapshot + horizon]`.
///
/// Departures on or before the snapshot are not "future" departures; callers
/// treat those records as already gone.
pub fn leaves_within_horizon(
    snapshot: NaiveDate,
    termination: NaiveDate,
    horizon_months: u32,
) -> bool {
    let horizon_end = snapshot
        .checked_add_months(chrono::Months::new(horizon_months))
        .unwrap_or(NaiveDate::MAX);
    termination > snapshot && termination <= horizon_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn tenure_is_floored_at_zero() {
        assert_eq!(tenure_months(d(2023, 6, 1), d(2023, 1, 1)), 0.0);
        assert_abs_diff_eq!(tenure_months(d(2022, 1, 1), d(2023, 1, 1)), 365.0 / 30.44);
    }

    #[test]
    fn horizon_window_is_left_open_right_closed() {
        let snap = d(2023, 1, 15);
        assert!(!leaves_within_horizon(snap, snap, 6));
        assert!(leaves_within_horizon(snap, d(2023, 1, 16), 6));
        assert!(leaves_within_horizon(snap, d(2023, 7, 15), 6));
        assert!(!leaves_within_horizon(snap, d(2023, 7, 16), 6));
        assert!(!leaves_within_horizon(snap, d(2022, 12, 1), 6));
    }
}
