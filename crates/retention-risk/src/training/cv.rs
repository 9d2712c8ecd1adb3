//! Time-respecting cross-validation folds.
//!
//! Expanding-window folds over chronologically sorted rows: fold `k` trains on
//! a prefix and validates on the block that follows it. Block edges are pushed
//! forward past same-date ties so a validation row never shares a date with
//! its training prefix.

use std::ops::Range;

use chrono::NaiveDate;

/// One train/validation split over row indices of a sorted slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesFold {
    pub index: usize,
    pub train: Range<usize>,
    pub valid: Range<usize>,
}

/// Smallest slice (train or validation) a fold may have.
pub const MIN_FOLD_ROWS: usize = 2;

/// Advance `i` past any rows dated the same as row `i - 1`.
fn skip_ties(dates: &[NaiveDate], mut i: usize) -> usize {
    while i > 0 && i < dates.len() && dates[i] == dates[i - 1] {
        i += 1;
    }
    i
}

/// Expanding-window folds over `dates` (ascending).
///
/// The slice is cut into `n_folds + 1` equal blocks (the first absorbs the
/// remainder); fold `k` trains on blocks `0..=k` and validates on block
/// `k + 1`. Folds with fewer than [`MIN_FOLD_ROWS`] rows on either side after
/// tie adjustment are dropped, with a debug log.
pub fn time_series_folds(dates: &[NaiveDate], n_folds: usize) -> Vec<TimeSeriesFold> {
    let n = dates.len();
    if n_folds == 0 || n < 2 * MIN_FOLD_ROWS {
        return Vec::new();
    }
    let block = n / (n_folds + 1);
    if block == 0 {
        return Vec::new();
    }
    let first_valid = n - n_folds * block;

    let mut folds = Vec::with_capacity(n_folds);
    for k in 0..n_folds {
        let start = skip_ties(dates, first_valid + k * block);
        let end = skip_ties(dates, (first_valid + (k + 1) * block).min(n)).max(start);
        if start < MIN_FOLD_ROWS || end - start < MIN_FOLD_ROWS {
            tracing::debug!(
                fold = k,
                train = start,
                valid = end - start,
                "skipping undersized fold"
            );
            continue;
        }
        folds.push(TimeSeriesFold {
            index: k,
            train: 0..start,
            valid: start..end,
        });
    }
    folds
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn dates(days: &[u64]) -> Vec<NaiveDate> {
        let base = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        days.iter().map(|&d| base + Days::new(d)).collect()
    }

    #[test]
    fn matches_expanding_window_layout() {
        let d = dates(&(0..12).collect::<Vec<_>>());
        let folds = time_series_folds(&d, 3);
        let layout: Vec<_> = folds
            .iter()
            .map(|f| (f.train.clone(), f.valid.clone()))
            .collect();
        assert_eq!(layout, vec![(0..3, 3..6), (0..6, 6..9), (0..9, 9..12)]);
    }

    #[test]
    fn validation_never_shares_a_date_with_training() {
        let d = dates(&[0, 0, 1, 1, 1, 2, 2, 3, 3, 3, 4, 4, 5, 5, 6, 6]);
        for fold in time_series_folds(&d, 3) {
            let last_train = d[fold.train.end - 1];
            assert!(d[fold.valid.clone()].iter().all(|&v| v > last_train));
        }
    }

    #[test]
    fn degenerate_inputs_yield_no_folds() {
        assert!(time_series_folds(&dates(&[0, 1, 2]), 5).is_empty());
        assert!(time_series_folds(&dates(&[0; 20]), 4).is_empty());
        assert!(time_series_folds(&dates(&[0, 1, 2, 3]), 0).is_empty());
    }
}
