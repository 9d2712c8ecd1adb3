//! Depth-wise histogram tree grower.
//!
//! Grows one regression tree on gradient/hessian pairs. Each level is
//! expanded in full before the next. For every split, the histogram of the
//! smaller child is built directly and the larger child's is derived by
//! subtracting it from the parent's.

use crate::repr::{MutableTree, NodeId, Tree};
use crate::training::binning::BinnedMatrix;
use crate::training::objective::GradsTuple;
use crate::training::split::{
    best_split, best_split_for_feature, build_feature_histogram, subtract_histogram,
    FeatureHistogram, GainParams, NodeStats,
};
use crate::utils::Parallelism;

/// Parameters for tree growth.
#[derive(Clone, Debug)]
pub struct GrowerParams {
    pub gain: GainParams,
    /// Shrinkage applied to leaf values.
    pub learning_rate: f32,
    pub max_depth: u32,
}

impl Default for GrowerParams {
    fn default() -> Self {
        Self {
            gain: GainParams::default(),
            learning_rate: 0.1,
            max_depth: 4,
        }
    }
}

/// A node waiting to be split or finalized.
struct Candidate {
    node: NodeId,
    rows: Vec<u32>,
    stats: NodeStats,
    histograms: Vec<FeatureHistogram>,
    depth: u32,
}

/// Grows trees over a fixed binned matrix.
pub struct TreeGrower<'a> {
    binned: &'a BinnedMatrix,
    params: GrowerParams,
    parallelism: Parallelism,
}

impl<'a> TreeGrower<'a> {
    pub fn new(binned: &'a BinnedMatrix, params: GrowerParams, parallelism: Parallelism) -> Self {
        Self {
            binned,
            params,
            parallelism,
        }
    }

    /// Histograms of every feature over `rows`, feature-parallel when allowed.
    fn build_histograms(&self, rows: &[u32], grad_hess: &[GradsTuple]) -> Vec<FeatureHistogram> {
        let binned = self.binned;
        self.parallelism.maybe_par_map(0..binned.n_features(), |f| {
            build_feature_histogram(binned, f, rows, grad_hess)
        })
    }

    /// Grow one tree on `rows` (the sampled subset, or every row).
    pub fn grow(&self, grad_hess: &[GradsTuple], rows: Vec<u32>) -> Tree {
        let root_stats = NodeStats::from_rows(&rows, grad_hess);
        let mut tree = MutableTree::with_root(root_stats.hess as f32);
        let root = Candidate {
            node: 0,
            histograms: self.build_histograms(&rows, grad_hess),
            rows,
            stats: root_stats,
            depth: 0,
        };

        let mut level = vec![root];
        while !level.is_empty() {
            let mut next = Vec::with_capacity(level.len() * 2);
            for candidate in level {
                match self.try_split(&mut tree, candidate, grad_hess) {
                    Ok((left, right)) => {
                        next.push(left);
                        next.push(right);
                    }
                    Err(leaf) => {
                        let value = self.params.gain.compute_leaf_weight(&leaf.stats)
                            * self.params.learning_rate;
                        tree.set_leaf_value(leaf.node, value);
                    }
                }
            }
            level = next;
        }
        tree.freeze()
    }

    /// Split `c` if a valid split exists; otherwise hand it back as a leaf.
    fn try_split(
        &self,
        tree: &mut MutableTree,
        c: Candidate,
        grad_hess: &[GradsTuple],
    ) -> Result<(Candidate, Candidate), Candidate> {
        if c.depth >= self.params.max_depth || c.rows.len() < 2 {
            return Err(c);
        }
        let gain_params = &self.params.gain;
        let split = best_split(
            c.histograms
                .iter()
                .enumerate()
                .map(|(f, hist)| best_split_for_feature(f, hist, &c.stats, gain_params)),
        );
        let Some(split) = split else { return Err(c) };

        let bins = self.binned.feature_bins(split.feature);
        let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = c
            .rows
            .iter()
            .partition(|&&r| bins[r as usize] as usize <= split.bin);

        let threshold = self.binned.mapper(split.feature).threshold(split.bin);
        let (left_node, right_node) = tree.split(
            c.node,
            split.feature as u32,
            threshold,
            split.gain as f32,
            split.left.hess as f32,
            split.right.hess as f32,
        );

        let left_is_smaller = left_rows.len() <= right_rows.len();
        let small_rows = if left_is_smaller {
            &left_rows
        } else {
            &right_rows
        };
        let small = self.build_histograms(small_rows, grad_hess);
        let large: Vec<FeatureHistogram> = c
            .histograms
            .iter()
            .zip(&small)
            .map(|(parent, child)| subtract_histogram(parent, child))
            .collect();
        let (left_hist, right_hist) = if left_is_smaller {
            (small, large)
        } else {
            (large, small)
        };

        let depth = c.depth + 1;
        Ok((
            Candidate {
                node: left_node,
                rows: left_rows,
                stats: split.left,
                histograms: left_hist,
                depth,
            },
            Candidate {
                node: right_node,
                rows: right_rows,
                stats: split.right,
                histograms: right_hist,
                depth,
            },
        ))
    }
}
