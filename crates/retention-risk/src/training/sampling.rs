//! Seeded row subsampling.

use rand::seq::index;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Draws a uniform row subset per boosting round.
///
/// The subset for round `r` depends only on `(seed, r)`, so training is
/// reproducible regardless of thread count.
#[derive(Debug, Clone)]
pub struct RowSampler {
    subsample: f32,
    n_rows: usize,
    seed: u64,
}

impl RowSampler {
    pub fn new(subsample: f32, n_rows: usize, seed: u64) -> Self {
        Self {
            subsample,
            n_rows,
            seed,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.subsample < 1.0 && self.n_rows > 1
    }

    /// Sorted row indices for `round`, or `None` when every row is used.
    pub fn sample(&self, round: usize) -> Option<Vec<u32>> {
        if !self.is_enabled() {
            return None;
        }
        let k = (self.n_rows as f64 * self.subsample as f64).round() as usize;
        let k = k.clamp(1, self.n_rows);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed.wrapping_add(round as u64));
        let mut rows: Vec<u32> = index::sample(&mut rng, self.n_rows, k)
            .into_iter()
            .map(|i| i as u32)
            .collect();
        rows.sort_unstable();
        Some(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sample_is_disabled() {
        assert!(RowSampler::new(1.0, 100, 0).sample(0).is_none());
    }

    #[test]
    fn samples_are_sized_sorted_and_reproducible() {
        let sampler = RowSampler::new(0.8, 100, 42);
        let a = sampler.sample(3).unwrap();
        assert_eq!(a.len(), 80);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(a, sampler.sample(3).unwrap());
        assert_ne!(a, sampler.sample(4).unwrap());
    }
}
