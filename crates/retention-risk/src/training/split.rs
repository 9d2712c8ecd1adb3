//! Gain computation and histogram split finding.

use crate::training::binning::BinnedMatrix;
use crate::training::objective::GradsTuple;

// =============================================================================
// Gain Parameters
// =============================================================================

/// Regularization and split constraints.
#[derive(Clone, Debug, PartialEq)]
pub struct GainParams {
    /// L2 regularization (lambda).
    pub reg_lambda: f32,
    /// Minimum split gain (gamma).
    pub min_gain: f32,
    /// Minimum sum of hessians per child.
    pub min_child_weight: f32,
    /// Minimum samples per child.
    pub min_samples_leaf: u32,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            reg_lambda: 1.0,
            min_gain: 0.0,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
        }
    }
}

impl GainParams {
    /// XGBoost split gain.
    ///
    /// ```text
    /// gain = 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G_P²/(H_P + λ)] - γ
    /// ```
    #[inline]
    pub fn compute_gain(&self, left: &NodeStats, right: &NodeStats, parent: &NodeStats) -> f64 {
        let lambda = self.reg_lambda as f64;
        let score = |s: &NodeStats| s.grad * s.grad / (s.hess + lambda);
        0.5 * (score(left) + score(right) - score(parent)) - self.min_gain as f64
    }

    #[inline]
    pub fn is_valid_split(&self, left: &NodeStats, right: &NodeStats) -> bool {
        let min_weight = self.min_child_weight as f64;
        left.hess >= min_weight
            && right.hess >= min_weight
            && left.count >= self.min_samples_leaf
            && right.count >= self.min_samples_leaf
    }

    /// Newton step `-G / (H + λ)`.
    #[inline]
    pub fn compute_leaf_weight(&self, stats: &NodeStats) -> f32 {
        (-stats.grad / (stats.hess + self.reg_lambda as f64)) as f32
    }
}

// =============================================================================
// Histograms
// =============================================================================

/// Accumulated gradient statistics for a node or bin.
///
/// `f64` sums: gain is a difference of large sums and the subtraction trick
/// compounds rounding in `f32`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    pub grad: f64,
    pub hess: f64,
    pub count: u32,
}

impl NodeStats {
    #[inline]
    pub fn add(&mut self, gh: GradsTuple) {
        self.grad += gh.grad as f64;
        self.hess += gh.hess as f64;
        self.count += 1;
    }

    #[inline]
    pub fn sub(&self, other: &NodeStats) -> NodeStats {
        NodeStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count.saturating_sub(other.count),
        }
    }

    pub fn from_rows(rows: &[u32], grad_hess: &[GradsTuple]) -> Self {
        let mut s = Self::default();
        for &r in rows {
            s.add(grad_hess[r as usize]);
        }
        s
    }
}

/// Per-bin statistics for one feature.
pub type FeatureHistogram = Vec<NodeStats>;

/// Build the histogram of `feature` over `rows`.
pub fn build_feature_histogram(
    binned: &BinnedMatrix,
    feature: usize,
    rows: &[u32],
    grad_hess: &[GradsTuple],
) -> FeatureHistogram {
    let mut hist = vec![NodeStats::default(); binned.mapper(feature).n_bins()];
    let bins = binned.feature_bins(feature);
    for &r in rows {
        hist[bins[r as usize] as usize].add(grad_hess[r as usize]);
    }
    hist
}

/// Sibling histogram via the subtraction trick: `parent - child`.
pub fn subtract_histogram(parent: &FeatureHistogram, child: &FeatureHistogram) -> FeatureHistogram {
    parent.iter().zip(child).map(|(p, c)| p.sub(c)).collect()
}

// =============================================================================
// Split Finding
// =============================================================================

/// Best split found for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitInfo {
    pub feature: usize,
    /// Last bin that goes left.
    pub bin: usize,
    pub gain: f64,
    pub left: NodeStats,
    pub right: NodeStats,
}

/// Scan one feature's histogram for its best valid split.
pub fn best_split_for_feature(
    feature: usize,
    hist: &FeatureHistogram,
    parent: &NodeStats,
    params: &GainParams,
) -> Option<SplitInfo> {
    let mut best: Option<SplitInfo> = None;
    let mut left = NodeStats::default();

    for (bin, stats) in hist.iter().enumerate().take(hist.len().saturating_sub(1)) {
        left.grad += stats.grad;
        left.hess += stats.hess;
        left.count += stats.count;
        let right = parent.sub(&left);

        if left.count == 0 || right.count == 0 || !params.is_valid_split(&left, &right) {
            continue;
        }
        let gain = params.compute_gain(&left, &right, parent);
        if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
            best = Some(SplitInfo {
                feature,
                bin,
                gain,
                left,
                right,
            });
        }
    }
    best
}

/// Best split across features. Ties go to the lowest feature index, so the
/// result does not depend on evaluation order.
pub fn best_split(candidates: impl IntoIterator<Item = Option<SplitInfo>>) -> Option<SplitInfo> {
    candidates
        .into_iter()
        .flatten()
        .fold(None, |best: Option<SplitInfo>, c| match best {
            Some(b) if b.gain > c.gain || (b.gain == c.gain && b.feature < c.feature) => Some(b),
            _ => Some(c),
        })
}
