//! Chronological train/test split.
//!
//! Random splits let the model see the future. Here the population is ordered
//! by snapshot date and cut at a date quantile: everything on or before the
//! cutoff trains, everything strictly after it tests.

use chrono::{Datelike, NaiveDate};

use super::snapshot::EmployeeSnapshot;
use crate::error::ConfigError;

/// Result of [`chronological_split`].
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalSplit {
    /// Snapshots dated on or before `cutoff`, in chronological order.
    pub train: Vec<EmployeeSnapshot>,
    /// Snapshots dated strictly after `cutoff`, in chronological order.
    pub test: Vec<EmployeeSnapshot>,
    /// Last date that belongs to the training slice.
    pub cutoff: NaiveDate,
}

impl TemporalSplit {
    pub fn into_parts(self) -> (Vec<EmployeeSnapshot>, Vec<EmployeeSnapshot>) {
        (self.train, self.test)
    }
}

/// Sort snapshots by date, ties broken by employee id. Stable.
pub fn sort_chronologically(snapshots: &mut [EmployeeSnapshot]) {
    snapshots.sort_by(|a, b| {
        a.snapshot_date
            .cmp(&b.snapshot_date)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });
}

/// The `q` quantile of `sorted` dates.
///
/// Linear interpolation between order statistics on day numbers, truncated to
/// a calendar date. `sorted` must be ascending. Returns `None` when empty.
pub fn date_quantile(sorted: &[NaiveDate], q: f64) -> Option<NaiveDate> {
    let first = sorted.first()?;
    let n = sorted.len();
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil().min((n - 1) as f64) as usize;

    let day = |d: &NaiveDate| d.num_days_from_ce() as f64;
    let lo_day = day(&sorted[lo]);
    let value = lo_day + (day(&sorted[hi]) - lo_day) * (pos - lo as f64);

    Some(NaiveDate::from_num_days_from_ce_opt(value.floor() as i32).unwrap_or(*first))
}

/// Split snapshots at the `train_fraction` date quantile.
///
/// # Errors
///
/// [`ConfigError::DegenerateSplit`] when the input is empty, the fraction is
/// outside `(0, 1)`, or either side of the cut would be empty (for example
/// when every snapshot shares a date).
pub fn chronological_split(
    mut snapshots: Vec<EmployeeSnapshot>,
    train_fraction: f64,
) -> Result<TemporalSplit, ConfigError> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(ConfigError::DegenerateSplit(format!(
            "train_fraction must be in (0, 1), got {train_fraction}"
        )));
    }
    if snapshots.is_empty() {
        return Err(ConfigError::DegenerateSplit("no snapshots to split".into()));
    }

    sort_chronologically(&mut snapshots);
    let dates: Vec<NaiveDate> = snapshots.iter().map(|s| s.snapshot_date).collect();
    let cutoff = date_quantile(&dates, train_fraction)
        .ok_or_else(|| ConfigError::DegenerateSplit("no snapshots to split".into()))?;

    let n_train = dates.partition_point(|d| *d <= cutoff);
    let test = snapshots.split_off(n_train);
    let train = snapshots;

    if train.is_empty() || test.is_empty() {
        return Err(ConfigError::DegenerateSplit(format!(
            "cutoff {cutoff} leaves {} train and {} test snapshot(s); dates span {} to {}",
            train.len(),
            test.len(),
            dates[0],
            dates[dates.len() - 1],
        )));
    }

    Ok(TemporalSplit {
        train,
        test,
        cutoff,
    })
}
