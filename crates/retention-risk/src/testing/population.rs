use chrono::{Days, NaiveDate};
use rand::prelude::*;

use crate::data::{
    tenure_months, EmployeeSnapshot, RawRecord, DEMO_DEPARTMENTS, DEMO_LEVELS, SYNTHETIC_ID_PREFIX,
};

/// Ground-truth departure probability used to label synthetic rows.
///
/// New hires and underpaid employees leave more often.
pub fn synthetic_risk(tenure_months: f64, salary_vs_market: f64, is_neurodivergent: bool) -> f64 {
    let mut logit = -1.5 - 4.0 * (salary_vs_market - 1.0);
    if tenure_months < 12.0 {
        logit += 2.0;
    }
    if tenure_months < 36.0 {
        logit += 1.0;
    }
    if is_neurodivergent {
        logit -= 0.5;
    }
    1.0 / (1.0 + (-logit).exp())
}

/// Generate `n` labelled snapshots dated uniformly in `[start, end]`.
///
/// Features are drawn independently of the snapshot date, so train and test
/// slices of a chronological split share one distribution. Leavers get a
/// termination date 1..=180 days after their snapshot, inside the default
/// 6-month horizon. Employee ids carry [`SYNTHETIC_ID_PREFIX`] so a
/// written-out population is recognised as demo data when read back.
pub fn synthetic_population(
    n: usize,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> Vec<EmployeeSnapshot> {
    let mut rng = StdRng::seed_from_u64(seed);
    let span = end.signed_duration_since(start).num_days().max(0) as u64;

    (0..n)
        .map(|i| {
            let snapshot_date = start
                .checked_add_days(Days::new(rng.gen_range(0..=span)))
                .unwrap_or(start);
            let tenure_days: u64 = rng.gen_range(0..=1826);
            let hire_date = snapshot_date
                .checked_sub_days(Days::new(tenure_days))
                .unwrap_or(snapshot_date);
            let salary_vs_market: f64 = rng.gen_range(0.8..1.4);
            let days_since_promotion = rng.gen_range(0..=1095u64).min(tenure_days) as f64;
            let manager_tenure_months = rng.gen_range(6..=84) as f64;
            let team_size = rng.gen_range(3..=20) as f64;
            let department = DEMO_DEPARTMENTS[rng.gen_range(0..DEMO_DEPARTMENTS.len())];
            let level = DEMO_LEVELS[rng.gen_range(0..DEMO_LEVELS.len())];
            let is_neurodivergent = rng.gen_bool(0.12);
            let leave_draw: f64 = rng.gen();
            let departure_offset: u64 = rng.gen_range(1..=180);

            let tenure = tenure_months(hire_date, snapshot_date);
            let leaves = leave_draw < synthetic_risk(tenure, salary_vs_market, is_neurodivergent);

            EmployeeSnapshot {
                employee_id: format!("{SYNTHETIC_ID_PREFIX}{i:05}"),
                hire_date,
                snapshot_date,
                tenure_months: tenure,
                salary_vs_market,
                days_since_promotion,
                manager_tenure_months,
                team_size,
                department: department.to_string(),
                level: level.to_string(),
                is_neurodivergent,
                termination_date: leaves
                    .then(|| snapshot_date.checked_add_days(Days::new(departure_offset)))
                    .flatten(),
                will_leave_within_horizon: leaves,
            }
        })
        .collect()
}

/// [`synthetic_population`] as complete raw records.
pub fn synthetic_raw_records(
    n: usize,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> Vec<RawRecord> {
    synthetic_population(n, start, end, seed)
        .iter()
        .map(RawRecord::from)
        .collect()
}
