//! Common utilities used across the crate.
//!
//! Parallelism configuration and descriptive statistics shared by the
//! preprocessing, leakage and training code.

use rayon::prelude::*;

use crate::error::ConfigError;

// =============================================================================
// Statistical Utilities
// =============================================================================

/// Arithmetic mean. Returns `0.0` for an empty iterator.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0f64, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Population mean and standard deviation (ddof = 0).
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let m = mean(values.iter().copied());
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    (m, var.sqrt())
}

/// Pearson correlation coefficient.
///
/// Returns `None` when either input has zero variance or the lengths differ,
/// since the coefficient is undefined there.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x.iter().copied());
    let my = mean(y.iter().copied());

    let (mut sxy, mut sxx, mut syy) = (0.0f64, 0.0f64, 0.0f64);
    for (&a, &b) in x.iter().zip(y) {
        let (da, db) = (a - mx, b - my);
        sxy += da * db;
        sxx += da * da;
        syy += db * db;
    }

    const EPS: f64 = 1e-12;
    if sxx < EPS || syy < EPS {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// Passed through training components as a plain flag. When `Parallel`,
/// components may use `rayon` parallel iterators; the thread pool itself is
/// set up once by [`run_with_threads`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if the rayon pool has multiple threads)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over `iter`, in parallel when allowed. Output order always
    /// matches input order.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = use rayon's global pool
/// - `1` = sequential (no thread pool)
/// - `n > 1` = dedicated pool with exactly `n` threads
pub fn run_with_threads<T: Send>(
    n_threads: usize,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> Result<T, ConfigError> {
    let parallelism = Parallelism::from_threads(n_threads);

    match (n_threads, parallelism) {
        (_, Parallelism::Sequential) => Ok(f(Parallelism::Sequential)),
        (0, Parallelism::Parallel) => Ok(f(Parallelism::Parallel)),
        (n, Parallelism::Parallel) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            Ok(pool.install(|| f(Parallelism::Parallel)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mean_std_of_simple_series() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_abs_diff_eq!(m, 5.0);
        assert_abs_diff_eq!(s, 2.0);
        assert_eq!(mean_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn pearson_perfect_and_undefined() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert_abs_diff_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);

        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert_abs_diff_eq!(pearson(&x, &neg).unwrap(), -1.0, epsilon = 1e-12);

        // constant input has no correlation
        assert_eq!(pearson(&x, &[1.0; 4]), None);
        assert_eq!(pearson(&x, &y[..3]), None);
    }

    #[test]
    fn parallelism_from_threads() {
        assert!(!Parallelism::from_threads(1).is_parallel());
        assert!(Parallelism::from_threads(2).is_parallel());
    }

    #[test]
    fn run_with_threads_explicit() {
        let n = run_with_threads(2, |_| rayon::current_num_threads()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(run_with_threads(1, |p| p).unwrap(), Parallelism::Sequential);
    }

    #[test]
    fn maybe_par_map_preserves_order() {
        let seq: Vec<_> = Parallelism::Sequential.maybe_par_map(0..5usize, |i| i * 2);
        let par: Vec<_> = Parallelism::Parallel.maybe_par_map(0..5usize, |i| i * 2);
        assert_eq!(seq, vec![0, 2, 4, 6, 8]);
        assert_eq!(seq, par);
    }
}
