//! Feature quantization for histogram split finding.
//!
//! Each feature gets a [`BinMapper`] holding ascending cut points. A value
//! falls in bin `b` when `cuts[b - 1] < value <= cuts[b]`; splitting after
//! bin `b` therefore corresponds to the raw-value rule `value <= cuts[b]`,
//! which is what the trees store.

use ndarray::ArrayView2;

use crate::utils::Parallelism;

/// Largest supported bin count (bins are stored as `u8`).
pub const MAX_BINS: usize = 256;

/// Cut points for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    cuts: Vec<f64>,
}

impl BinMapper {
    /// Build cuts from the feature's values.
    ///
    /// With at most `max_bins` distinct values every value gets its own bin
    /// (cuts at midpoints). Otherwise cuts are placed at distinct-value
    /// quantiles.
    pub fn fit(values: impl IntoIterator<Item = f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS);
        let mut distinct: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();

        let midpoint = |i: usize| distinct[i - 1] + (distinct[i] - distinct[i - 1]) / 2.0;
        let n = distinct.len();
        let mut cuts: Vec<f64> = if n <= max_bins {
            (1..n).map(midpoint).collect()
        } else {
            (1..max_bins)
                .map(|k| midpoint((k * n / max_bins).max(1)))
                .collect()
        };
        cuts.dedup();
        Self { cuts }
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        self.cuts.len() + 1
    }

    #[inline]
    pub fn bin(&self, value: f64) -> u8 {
        self.cuts.partition_point(|&c| c < value) as u8
    }

    /// Raw-value threshold for a split after `bin`.
    #[inline]
    pub fn threshold(&self, bin: usize) -> f64 {
        self.cuts[bin]
    }
}

/// Column-major binned copy of a feature matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    n_rows: usize,
    mappers: Vec<BinMapper>,
    /// `bins[f * n_rows + row]`
    bins: Vec<u8>,
}

impl BinnedMatrix {
    /// Quantize `features` (`(n_rows, n_features)`), fitting one mapper per
    /// column. Columns are processed in parallel when allowed.
    pub fn from_features(
        features: ArrayView2<f64>,
        max_bins: usize,
        parallelism: Parallelism,
    ) -> Self {
        let n_rows = features.nrows();
        let columns = parallelism.maybe_par_map(0..features.ncols(), |f| {
            let column = features.column(f);
            let mapper = BinMapper::fit(column.iter().copied(), max_bins);
            let bins: Vec<u8> = column.iter().map(|&v| mapper.bin(v)).collect();
            (mapper, bins)
        });

        let mut mappers = Vec::with_capacity(columns.len());
        let mut bins = Vec::with_capacity(n_rows * columns.len());
        for (mapper, column_bins) in columns {
            mappers.push(mapper);
            bins.extend(column_bins);
        }
        Self {
            n_rows,
            mappers,
            bins,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.mappers.len()
    }

    #[inline]
    pub fn mapper(&self, feature: usize) -> &BinMapper {
        &self.mappers[feature]
    }

    /// All bins of one feature.
    #[inline]
    pub fn feature_bins(&self, feature: usize) -> &[u8] {
        &self.bins[feature * self.n_rows..(feature + 1) * self.n_rows]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn few_distinct_values_get_own_bins() {
        let m = BinMapper::fit([3.0, 1.0, 2.0, 1.0], 64);
        assert_eq!(m.n_bins(), 3);
        assert_eq!(m.bin(1.0), 0);
        assert_eq!(m.bin(2.0), 1);
        assert_eq!(m.bin(3.0), 2);
        assert_eq!(m.threshold(0), 1.5);
        // out-of-range values clamp to the edge bins
        assert_eq!(m.bin(-10.0), 0);
        assert_eq!(m.bin(99.0), 2);
    }

    #[test]
    fn many_values_respect_max_bins() {
        let m = BinMapper::fit((0..1000).map(f64::from), 16);
        assert!(m.n_bins() <= 16);
        assert!(m.n_bins() > 8);
    }

    #[test]
    fn bin_and_threshold_agree() {
        let values: Vec<f64> = (0..300).map(|i| (i as f64 * 0.37).sin() * 10.0).collect();
        let m = BinMapper::fit(values.iter().copied(), 32);
        for b in 0..m.n_bins() - 1 {
            let t = m.threshold(b);
            for &v in &values {
                assert_eq!(m.bin(v) as usize <= b, v <= t);
            }
        }
    }

    #[test]
    fn constant_feature_has_one_bin() {
        let m = BinMapper::fit([5.0; 10], 64);
        assert_eq!(m.n_bins(), 1);
    }

    #[test]
    fn matrix_is_column_major() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 20.0]];
        let binned = BinnedMatrix::from_features(x.view(), 64, Parallelism::Sequential);
        assert_eq!(binned.feature_bins(0), &[0, 1, 2]);
        assert_eq!(binned.feature_bins(1), &[0, 0, 1]);
    }
}
