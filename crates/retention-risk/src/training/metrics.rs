//! Binary classification metrics.
//!
//! Every metric takes positive-class probabilities and 0/1 labels.

/// A scalar evaluation metric.
pub trait MetricFn: Send + Sync {
    fn compute(&self, probabilities: &[f64], labels: &[f32]) -> f64;

    fn name(&self) -> &'static str;
}

/// Decision threshold used by [`Accuracy`] and [`F1`].
pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[inline]
fn is_positive(label: f32) -> bool {
    label > 0.5
}

// =============================================================================
// AUC
// =============================================================================

/// Area under the ROC curve (rank statistic, ties averaged).
///
/// Returns 0.5 when only one class is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Auc;

impl MetricFn for Auc {
    fn compute(&self, probabilities: &[f64], labels: &[f32]) -> f64 {
        compute_auc(probabilities, labels)
    }

    fn name(&self) -> &'static str {
        "auc"
    }
}

fn compute_auc(predictions: &[f64], labels: &[f32]) -> f64 {
    let n = predictions.len().min(labels.len());
    let n_pos = labels[..n].iter().filter(|&&l| is_positive(l)).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| predictions[a].total_cmp(&predictions[b]));

    // Ascending ranks, averaged over ties.
    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && predictions[indices[j]] == predictions[indices[i]] {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let tied_positives = indices[i..j]
            .iter()
            .filter(|&&idx| is_positive(labels[idx]))
            .count();
        rank_sum_pos += tied_positives as f64 * avg_rank;
        i = j;
    }

    let (p, q) = (n_pos as f64, n_neg as f64);
    (rank_sum_pos - p * (p + 1.0) / 2.0) / (p * q)
}

// =============================================================================
// Accuracy / F1
// =============================================================================

/// Fraction of correct predictions at a probability threshold.
#[derive(Debug, Clone, Copy)]
pub struct Accuracy {
    pub threshold: f64,
}

impl Default for Accuracy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl MetricFn for Accuracy {
    fn compute(&self, probabilities: &[f64], labels: &[f32]) -> f64 {
        if probabilities.is_empty() {
            return 0.0;
        }
        let correct = probabilities
            .iter()
            .zip(labels)
            .filter(|&(&p, &l)| (p > self.threshold) == is_positive(l))
            .count();
        correct as f64 / probabilities.len() as f64
    }

    fn name(&self) -> &'static str {
        "accuracy"
    }
}

/// F1 score of the positive class. 0 when there are no true positives.
#[derive(Debug, Clone, Copy)]
pub struct F1 {
    pub threshold: f64,
}

impl Default for F1 {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl MetricFn for F1 {
    fn compute(&self, probabilities: &[f64], labels: &[f32]) -> f64 {
        let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
        for (&p, &l) in probabilities.iter().zip(labels) {
            match (p > self.threshold, is_positive(l)) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }
        if tp == 0 {
            return 0.0;
        }
        2.0 * tp as f64 / (2 * tp + fp + fn_) as f64
    }

    fn name(&self) -> &'static str {
        "f1"
    }
}

// =============================================================================
// LogLoss
// =============================================================================

/// Mean binary cross-entropy, probabilities clamped to `[1e-15, 1 - 1e-15]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLoss;

impl MetricFn for LogLoss {
    fn compute(&self, probabilities: &[f64], labels: &[f32]) -> f64 {
        const EPS: f64 = 1e-15;
        if probabilities.is_empty() {
            return 0.0;
        }
        let total: f64 = probabilities
            .iter()
            .zip(labels)
            .map(|(&p, &l)| {
                let p = p.clamp(EPS, 1.0 - EPS);
                if is_positive(l) {
                    -p.ln()
                } else {
                    -(1.0 - p).ln()
                }
            })
            .sum();
        total / probabilities.len() as f64
    }

    fn name(&self) -> &'static str {
        "logloss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case(&[0.1, 0.4, 0.35, 0.8], &[0.0, 0.0, 1.0, 1.0], 0.75)]
    #[case(&[0.1, 0.2, 0.8, 0.9], &[0.0, 0.0, 1.0, 1.0], 1.0)]
    #[case(&[0.9, 0.8, 0.2, 0.1], &[0.0, 0.0, 1.0, 1.0], 0.0)]
    #[case(&[0.5, 0.5, 0.5, 0.5], &[0.0, 1.0, 0.0, 1.0], 0.5)]
    #[case(&[0.1, 0.9], &[1.0, 1.0], 0.5)]
    fn auc_cases(#[case] p: &[f64], #[case] y: &[f32], #[case] expected: f64) {
        assert_abs_diff_eq!(Auc.compute(p, y), expected, epsilon = 1e-12);
    }

    #[test]
    fn accuracy_and_f1() {
        let p = [0.9, 0.2, 0.7, 0.4];
        let y = [1.0, 0.0, 0.0, 1.0];
        assert_abs_diff_eq!(Accuracy::default().compute(&p, &y), 0.5);
        // tp=1 fp=1 fn=1
        assert_abs_diff_eq!(F1::default().compute(&p, &y), 0.5);
        assert_eq!(F1::default().compute(&[0.1], &[1.0]), 0.0);
    }

    #[test]
    fn logloss_is_finite_at_extremes() {
        let v = LogLoss.compute(&[0.0, 1.0], &[1.0, 0.0]);
        assert!(v.is_finite() && v > 30.0);
        assert_abs_diff_eq!(LogLoss.compute(&[0.5], &[1.0]), std::f64::consts::LN_2);
    }
}
