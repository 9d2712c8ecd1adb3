//! Logistic loss: gradients, hessians and base score.

/// Gradient/hessian pair for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradsTuple {
    pub grad: f32,
    pub hess: f32,
}

/// Binary cross-entropy on logits.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticLoss;

impl LogisticLoss {
    const HESS_MIN: f32 = 1e-6;
    const BASE_CLAMP: f64 = 1e-7;

    #[inline]
    pub fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x.clamp(-500.0, 500.0)).exp())
    }

    /// Fill `grad_hess` from margins and 0/1 targets.
    ///
    /// `weights` may be empty for unweighted training.
    pub fn compute_gradients(
        &self,
        predictions: &[f32],
        targets: &[f32],
        weights: &[f32],
        grad_hess: &mut [GradsTuple],
    ) {
        debug_assert_eq!(predictions.len(), targets.len());
        debug_assert_eq!(predictions.len(), grad_hess.len());
        debug_assert!(weights.is_empty() || weights.len() == targets.len());

        for (i, pair) in grad_hess.iter_mut().enumerate() {
            let w = weights.get(i).copied().unwrap_or(1.0);
            let p = Self::sigmoid(predictions[i] as f64) as f32;
            pair.grad = w * (p - targets[i]);
            pair.hess = (w * p * (1.0 - p)).max(Self::HESS_MIN);
        }
    }

    /// Weighted log-odds of the positive rate. 0 for empty input.
    pub fn compute_base_score(&self, targets: &[f32], weights: &[f32]) -> f32 {
        if targets.is_empty() {
            return 0.0;
        }
        let (pos, total) = targets
            .iter()
            .enumerate()
            .fold((0.0f64, 0.0f64), |(pos, total), (i, &t)| {
                let w = weights.get(i).copied().unwrap_or(1.0) as f64;
                (pos + t as f64 * w, total + w)
            });
        if total <= 0.0 {
            return 0.0;
        }
        let p = (pos / total).clamp(Self::BASE_CLAMP, 1.0 - Self::BASE_CLAMP);
        (p / (1.0 - p)).ln() as f32
    }
}
