//! GBDT trainer.
//!
//! Orchestrates gradient computation, row sampling, tree growing and
//! prediction updates. Use [`GBDTTrainer::train`] to fit a [`Forest`] on an
//! encoded feature matrix.

use ndarray::ArrayView2;

use crate::error::DataError;
use crate::repr::Forest;
use crate::training::binning::BinnedMatrix;
use crate::training::grower::{GrowerParams, TreeGrower};
use crate::training::logger::{TrainingLogger, Verbosity};
use crate::training::metrics::{Auc, LogLoss, MetricFn};
use crate::training::objective::{GradsTuple, LogisticLoss};
use crate::training::sampling::RowSampler;
use crate::training::split::GainParams;
use crate::utils::Parallelism;

// =============================================================================
// GBDTParams
// =============================================================================

/// Parameters for GBDT training.
#[derive(Clone, Debug)]
pub struct GBDTParams {
    // --- Boosting ---
    pub n_trees: u32,
    pub learning_rate: f32,

    // --- Tree structure ---
    pub max_depth: u32,
    pub max_bins: usize,

    // --- Regularization ---
    pub gain: GainParams,

    // --- Sampling ---
    /// Row subsample fraction per round, in (0, 1].
    pub subsample: f32,

    pub verbosity: Verbosity,
    pub seed: u64,
}

impl Default for GBDTParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.1,
            max_depth: 4,
            max_bins: 64,
            gain: GainParams::default(),
            subsample: 0.8,
            verbosity: Verbosity::default(),
            seed: 42,
        }
    }
}

impl GBDTParams {
    fn to_grower_params(&self) -> GrowerParams {
        GrowerParams {
            gain: self.gain.clone(),
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
        }
    }
}

// =============================================================================
// GBDTTrainer
// =============================================================================

/// Gradient-boosted tree trainer with logistic loss.
#[derive(Debug, Clone, Default)]
pub struct GBDTTrainer {
    params: GBDTParams,
}

impl GBDTTrainer {
    pub fn new(params: GBDTParams) -> Self {
        Self { params }
    }

    /// Train a forest.
    ///
    /// This method does not create a thread pool; wrap the call in
    /// [`crate::utils::run_with_threads`] to control threading.
    ///
    /// * `features` - `(n_rows, n_features)` encoded matrix
    /// * `targets` - 0/1 labels, one per row
    /// * `weights` - per-row weights, or empty for uniform
    pub fn train(
        &self,
        features: ArrayView2<f64>,
        targets: &[f32],
        weights: &[f32],
        parallelism: Parallelism,
    ) -> Result<Forest, DataError> {
        let n_rows = features.nrows();
        let n_features = features.ncols();
        if n_rows == 0 || targets.len() != n_rows {
            return Err(DataError::Empty);
        }

        let objective = LogisticLoss;
        let binned = BinnedMatrix::from_features(features, self.params.max_bins, parallelism);
        let grower = TreeGrower::new(&binned, self.params.to_grower_params(), parallelism);
        let sampler = RowSampler::new(self.params.subsample, n_rows, self.params.seed);

        // Row-major copy for prediction updates.
        let rows: Vec<f64> = features.iter().copied().collect();

        let base_score = objective.compute_base_score(targets, weights);
        let mut forest = Forest::new(base_score);
        let mut predictions = vec![base_score; n_rows];
        let mut grad_hess = vec![GradsTuple::default(); n_rows];

        let mut logger = TrainingLogger::new(self.params.verbosity);
        logger.start_training(self.params.n_trees as usize, n_rows);
        let mut stalled = false;

        for round in 0..self.params.n_trees as usize {
            objective.compute_gradients(&predictions, targets, weights, &mut grad_hess);

            let sampled = sampler
                .sample(round)
                .unwrap_or_else(|| (0..n_rows as u32).collect());
            let tree = grower.grow(&grad_hess, sampled);
            if tree.n_nodes() == 1 && !stalled {
                stalled = true;
                logger.warn(&format!(
                    "round {round}: no split passed the gain and min-child-weight limits"
                ));
            }

            for (pred, row) in predictions
                .iter_mut()
                .zip(rows.chunks_exact(n_features.max(1)))
            {
                *pred += tree.predict_row(row);
            }
            forest.push_tree(tree);

            if logger.verbosity() >= Verbosity::Debug {
                let probs: Vec<f64> = predictions
                    .iter()
                    .map(|&m| LogisticLoss::sigmoid(m as f64))
                    .collect();
                logger.log_round(
                    round,
                    &[
                        (LogLoss.name(), LogLoss.compute(&probs, targets)),
                        (Auc.name(), Auc.compute(&probs, targets)),
                    ],
                );
            }
        }

        logger.finish_training(forest.n_trees());
        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::metrics::Auc;
    use ndarray::Array2;

    fn separable(n: usize) -> (Array2<f64>, Vec<f32>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64,
            1 => (i % 7) as f64,
            _ => ((i * 31) % 11) as f64,
        });
        let y = (0..n)
            .map(|i| f32::from(u8::from(i % 7 >= 4 || i >= n * 3 / 4)))
            .collect();
        (x, y)
    }

    #[test]
    fn learns_a_simple_signal() {
        let (x, y) = separable(300);
        let params = GBDTParams {
            n_trees: 30,
            verbosity: Verbosity::Silent,
            ..Default::default()
        };
        let forest = GBDTTrainer::new(params)
            .train(x.view(), &y, &[], Parallelism::Sequential)
            .unwrap();
        assert_eq!(forest.n_trees(), 30);

        let probs: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|r| forest.predict_proba(&r.to_vec()))
            .collect();
        assert!(Auc.compute(&probs, &y) > 0.75);
    }

    #[test]
    fn training_is_deterministic_across_thread_modes() {
        let (x, y) = separable(200);
        let params = GBDTParams {
            n_trees: 10,
            verbosity: Verbosity::Silent,
            ..Default::default()
        };
        let trainer = GBDTTrainer::new(params);
        let a = trainer
            .train(x.view(), &y, &[], Parallelism::Sequential)
            .unwrap();
        let b = trainer
            .train(x.view(), &y, &[], Parallelism::Parallel)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn constant_features_grow_single_leaf_trees() {
        let x = Array2::<f64>::ones((50, 3));
        let y: Vec<f32> = (0..50).map(|i| (i % 2) as f32).collect();
        let params = GBDTParams {
            n_trees: 5,
            verbosity: Verbosity::Warning,
            ..Default::default()
        };
        let forest = GBDTTrainer::new(params)
            .train(x.view(), &y, &[], Parallelism::Sequential)
            .unwrap();
        assert_eq!(forest.n_trees(), 5);
        assert!(forest.trees().all(|t| t.n_nodes() == 1));
    }

    #[test]
    fn empty_input_is_an_error() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            GBDTTrainer::default().train(x.view(), &[], &[], Parallelism::Sequential),
            Err(DataError::Empty)
        ));
    }
}
