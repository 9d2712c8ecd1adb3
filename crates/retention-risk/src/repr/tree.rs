//! Structure-of-arrays decision tree.
//!
//! Node 0 is the root. A split node sends a row left when
//! `row[split_feature] <= threshold`. Trees are built with [`MutableTree`]
//! during training and frozen into an immutable [`Tree`].

use std::fmt;

/// Node index within one tree.
pub type NodeId = u32;

// ============================================================================
// Tree
// ============================================================================

/// Immutable SoA tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    split_feature: Vec<u32>,
    threshold: Vec<f64>,
    left: Vec<NodeId>,
    right: Vec<NodeId>,
    is_leaf: Vec<bool>,
    leaf_value: Vec<f32>,
    /// Split gain (0 for leaves).
    gain: Vec<f32>,
    /// Hessian sum reaching the node.
    cover: Vec<f32>,
}

impl Tree {
    /// Assemble from raw arrays. Call [`Tree::validate`] on untrusted input.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        split_feature: Vec<u32>,
        threshold: Vec<f64>,
        left: Vec<NodeId>,
        right: Vec<NodeId>,
        is_leaf: Vec<bool>,
        leaf_value: Vec<f32>,
        gain: Vec<f32>,
        cover: Vec<f32>,
    ) -> Self {
        Self {
            split_feature,
            threshold,
            left,
            right,
            is_leaf,
            leaf_value,
            gain,
            cover,
        }
    }

    /// A single-leaf tree.
    pub fn leaf(value: f32) -> Self {
        Self::from_parts(
            vec![0],
            vec![0.0],
            vec![0],
            vec![0],
            vec![true],
            vec![value],
            vec![0.0],
            vec![0.0],
        )
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&l| l).count()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_feature(&self, node: NodeId) -> u32 {
        self.split_feature[node as usize]
    }

    #[inline]
    pub fn threshold(&self, node: NodeId) -> f64 {
        self.threshold[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right[node as usize]
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_value[node as usize]
    }

    #[inline]
    pub fn gain(&self, node: NodeId) -> f32 {
        self.gain[node as usize]
    }

    #[inline]
    pub fn cover(&self, node: NodeId) -> f32 {
        self.cover[node as usize]
    }

    /// Follow splits from the root to a leaf.
    #[inline]
    pub fn traverse_to_leaf(&self, row: &[f64]) -> NodeId {
        let mut node = 0;
        while !self.is_leaf(node) {
            let value = row[self.split_feature(node) as usize];
            node = if value <= self.threshold(node) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        node
    }

    #[inline]
    pub fn predict_row(&self, row: &[f64]) -> f32 {
        self.leaf_value(self.traverse_to_leaf(row))
    }

    /// Maximum root-to-leaf depth (a lone leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 0usize)];
        while let Some((node, d)) = stack.pop() {
            if self.is_leaf(node) {
                max_depth = max_depth.max(d);
            } else {
                stack.push((self.left_child(node), d + 1));
                stack.push((self.right_child(node), d + 1));
            }
        }
        max_depth
    }

    /// Raw arrays, in [`Tree::from_parts`] order.
    #[allow(clippy::type_complexity)]
    pub fn parts(&self) -> (&[u32], &[f64], &[NodeId], &[NodeId], &[bool], &[f32], &[f32], &[f32]) {
        (
            &self.split_feature,
            &self.threshold,
            &self.left,
            &self.right,
            &self.is_leaf,
            &self.leaf_value,
            &self.gain,
            &self.cover,
        )
    }

    /// Check structural invariants: consistent array lengths, in-bounds
    /// children, every node reached exactly once, features below `n_features`.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        let n = self.n_nodes();
        if n == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        let lens = [
            self.split_feature.len(),
            self.threshold.len(),
            self.left.len(),
            self.right.len(),
            self.leaf_value.len(),
            self.gain.len(),
            self.cover.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            return Err(TreeValidationError::LengthMismatch);
        }

        let mut visited = vec![false; n];
        let mut stack = vec![0u32];
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut visited[node as usize], true) {
                return Err(TreeValidationError::Revisited { node });
            }
            if self.is_leaf(node) {
                if !self.leaf_value(node).is_finite() {
                    return Err(TreeValidationError::NonFiniteLeaf { node });
                }
                continue;
            }
            if self.split_feature(node) as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature: self.split_feature(node),
                });
            }
            for child in [self.left_child(node), self.right_child(node)] {
                if child as usize >= n {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        child,
                        n_nodes: n,
                    });
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeValidationError {
    EmptyTree,
    LengthMismatch,
    ChildOutOfBounds {
        node: NodeId,
        child: NodeId,
        n_nodes: usize,
    },
    /// A node was reached by more than one path (DAG) or due to a cycle.
    Revisited { node: NodeId },
    FeatureOutOfRange { node: NodeId, feature: u32 },
    NonFiniteLeaf { node: NodeId },
}

impl fmt::Display for TreeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTree => write!(f, "tree has no nodes"),
            Self::LengthMismatch => write!(f, "node arrays have different lengths"),
            Self::ChildOutOfBounds { node, child, n_nodes } => {
                write!(f, "node {node} points to child {child} (tree has {n_nodes} nodes)")
            }
            Self::Revisited { node } => write!(f, "node {node} is reachable more than once"),
            Self::FeatureOutOfRange { node, feature } => {
                write!(f, "node {node} splits on unknown feature {feature}")
            }
            Self::NonFiniteLeaf { node } => write!(f, "leaf {node} has a non-finite value"),
        }
    }
}

// ============================================================================
// MutableTree
// ============================================================================

/// Tree under construction.
///
/// Nodes start as leaves; [`MutableTree::split`] turns a leaf into a split
/// node and allocates its two children.
#[derive(Debug, Clone)]
pub struct MutableTree {
    tree: Tree,
}

impl MutableTree {
    /// A tree with only a root leaf.
    pub fn with_root(cover: f32) -> Self {
        let mut tree = Tree::leaf(0.0);
        tree.cover[0] = cover;
        Self { tree }
    }

    fn push_leaf(&mut self, cover: f32) -> NodeId {
        let t = &mut self.tree;
        t.split_feature.push(0);
        t.threshold.push(0.0);
        t.left.push(0);
        t.right.push(0);
        t.is_leaf.push(true);
        t.leaf_value.push(0.0);
        t.gain.push(0.0);
        t.cover.push(cover);
        (t.is_leaf.len() - 1) as NodeId
    }

    /// Split a leaf. Returns `(left, right)` child ids.
    pub fn split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f64,
        gain: f32,
        left_cover: f32,
        right_cover: f32,
    ) -> (NodeId, NodeId) {
        let left = self.push_leaf(left_cover);
        let right = self.push_leaf(right_cover);
        let i = node as usize;
        let t = &mut self.tree;
        t.is_leaf[i] = false;
        t.split_feature[i] = feature;
        t.threshold[i] = threshold;
        t.left[i] = left;
        t.right[i] = right;
        t.gain[i] = gain;
        (left, right)
    }

    pub fn set_leaf_value(&mut self, node: NodeId, value: f32) {
        self.tree.leaf_value[node as usize] = value;
    }

    pub fn freeze(self) -> Tree {
        self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        let mut t = MutableTree::with_root(10.0);
        let (l, r) = t.split(0, 1, 0.5, 3.0, 4.0, 6.0);
        t.set_leaf_value(l, -1.0);
        t.set_leaf_value(r, 2.0);
        t.freeze()
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let t = stump();
        assert_eq!(t.predict_row(&[0.0, 0.5]), -1.0);
        assert_eq!(t.predict_row(&[0.0, 0.51]), 2.0);
        assert_eq!(t.n_leaves(), 2);
        assert_eq!(t.depth(), 1);
    }

    #[test]
    fn validation_catches_structure_errors() {
        assert!(stump().validate(2).is_ok());
        assert!(matches!(stump().validate(1), Err(TreeValidationError::FeatureOutOfRange { .. })));

        let base = stump();
        let (f, th, _, r, leaf, v, g, c) = base.parts();
        let looped = Tree::from_parts(
            f.to_vec(),
            th.to_vec(),
            vec![0, 0, 0],
            r.to_vec(),
            leaf.to_vec(),
            v.to_vec(),
            g.to_vec(),
            c.to_vec(),
        );
        assert!(matches!(looped.validate(2), Err(TreeValidationError::Revisited { .. })));
    }

    #[test]
    fn single_leaf() {
        let t = Tree::leaf(0.25);
        assert_eq!(t.predict_row(&[]), 0.25);
        assert_eq!(t.depth(), 0);
    }
}
