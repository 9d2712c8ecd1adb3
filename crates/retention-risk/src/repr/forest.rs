//! Additive tree ensemble for binary classification.

use std::fmt;

use super::tree::{Tree, TreeValidationError};
use crate::training::LogisticLoss;

/// Base score plus a sequence of trees, all on the logit scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    base_score: f32,
    trees: Vec<Tree>,
}

impl Forest {
    pub fn new(base_score: f32) -> Self {
        Self {
            base_score,
            trees: Vec::new(),
        }
    }

    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    #[inline]
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Raw logit for one row.
    pub fn predict_margin(&self, row: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score as f64, |acc, t| acc + t.predict_row(row) as f64)
    }

    /// Positive-class probability for one row.
    #[inline]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        LogisticLoss::sigmoid(self.predict_margin(row))
    }

    /// Check every tree against `n_features`.
    pub fn validate(&self, n_features: usize) -> Result<(), ForestValidationError> {
        if !self.base_score.is_finite() {
            return Err(ForestValidationError::NonFiniteBaseScore);
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|error| ForestValidationError::InvalidTree { tree_idx, error })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestValidationError {
    NonFiniteBaseScore,
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

impl fmt::Display for ForestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteBaseScore => write!(f, "base score is not finite"),
            Self::InvalidTree { tree_idx, error } => write!(f, "tree {tree_idx}: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::MutableTree;
    use approx::assert_abs_diff_eq;

    #[test]
    fn margin_sums_base_and_leaves() {
        let mut forest = Forest::new(0.5);
        forest.push_tree(Tree::leaf(0.25));
        let mut t = MutableTree::with_root(1.0);
        let (l, r) = t.split(0, 0, 1.0, 1.0, 0.5, 0.5);
        t.set_leaf_value(l, -1.0);
        t.set_leaf_value(r, 1.0);
        forest.push_tree(t.freeze());

        assert_abs_diff_eq!(forest.predict_margin(&[0.0]), -0.25);
        assert_abs_diff_eq!(forest.predict_margin(&[2.0]), 1.75);
        assert_abs_diff_eq!(forest.predict_proba(&[0.0]), LogisticLoss::sigmoid(-0.25));
        assert_eq!(forest.n_trees(), 2);
    }

    #[test]
    fn validate_rejects_bad_base_score() {
        assert_eq!(
            Forest::new(f32::NAN).validate(1),
            Err(ForestValidationError::NonFiniteBaseScore)
        );
    }
}
