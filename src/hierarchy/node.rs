//! Binary cluster tree node.

use core::mem;

use serde::{Deserialize, Serialize, Serializer};

use super::fragment::Fragment;
use crate::error::{Error, Result};

/// A node in the merge tree produced by [`crate::Clusterer`].
///
/// Leaves carry the position of one item in the sanitized item list.
/// Branches exclusively own their two children; `left` is the cluster that
/// came first in the forest when the pair was merged.
///
/// Serialized as a flat post-order node list. Serializing, deserializing,
/// folding and dropping all walk the tree with an explicit stack, so a
/// degenerate chain of any depth is safe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "FlatTree")]
pub enum ClusterNode {
    /// An original item.
    Leaf {
        /// Position in the item list.
        index: usize,
    },
    /// A merge of two clusters.
    Branch {
        /// First-chosen cluster.
        left: Box<ClusterNode>,
        /// Second-chosen cluster.
        right: Box<ClusterNode>,
        /// Distance at which the two were merged.
        height: f64,
        /// Leaves beneath this branch.
        leaf_count: usize,
    },
}

impl ClusterNode {
    /// Leaf for item `index`.
    pub fn leaf(index: usize) -> Self {
        ClusterNode::Leaf { index }
    }

    /// Branch owning `left` and `right`, merged at `height`.
    pub fn branch(left: ClusterNode, right: ClusterNode, height: f64) -> Self {
        let leaf_count = left.leaf_count() + right.leaf_count();
        ClusterNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            height,
            leaf_count,
        }
    }

    /// Check if this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, ClusterNode::Leaf { .. })
    }

    /// Item index if this is a leaf.
    pub fn as_leaf(&self) -> Option<usize> {
        match self {
            ClusterNode::Leaf { index } => Some(*index),
            _ => None,
        }
    }

    /// Children if this is a branch.
    pub fn children(&self) -> Option<(&ClusterNode, &ClusterNode)> {
        match self {
            ClusterNode::Branch { left, right, .. } => Some((&**left, &**right)),
            _ => None,
        }
    }

    /// Number of leaves: 1 for a leaf, the sum over children for a branch.
    pub fn leaf_count(&self) -> usize {
        match self {
            ClusterNode::Leaf { .. } => 1,
            ClusterNode::Branch { leaf_count, .. } => *leaf_count,
        }
    }

    /// Merge distance; 0 for a leaf.
    pub fn height(&self) -> f64 {
        match self {
            ClusterNode::Leaf { .. } => 0.0,
            ClusterNode::Branch { height, .. } => *height,
        }
    }

    /// Longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, d)) = stack.pop() {
            match node {
                ClusterNode::Leaf { .. } => deepest = deepest.max(d),
                ClusterNode::Branch { left, right, .. } => {
                    stack.push((&**right, d + 1));
                    stack.push((&**left, d + 1));
                }
            }
        }
        deepest
    }

    /// Leaf indices, left to right.
    pub fn leaves(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.leaf_count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                ClusterNode::Leaf { index } => out.push(*index),
                ClusterNode::Branch { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    /// True if the leaves are exactly `0..n`, each once.
    pub fn covers(&self, n: usize) -> bool {
        let mut seen = vec![false; n];
        for i in self.leaves() {
            match seen.get_mut(i) {
                Some(s) if !*s => *s = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Depth-first fold: `leaf` maps each leaf index, `branch` combines the
    /// left and right results. `leaf` runs exactly once per leaf, left to right.
    pub fn fold<R, L, B>(&self, leaf: &mut L, branch: &mut B) -> R
    where
        L: FnMut(usize) -> R,
        B: FnMut(R, R, &ClusterNode) -> R,
    {
        let mut results: Vec<R> = Vec::new();
        let mut stack = vec![(self, false)];
        while let Some((node, expanded)) = stack.pop() {
            match node {
                ClusterNode::Leaf { index } => results.push(leaf(*index)),
                ClusterNode::Branch { left, right, .. } if !expanded => {
                    stack.push((node, true));
                    stack.push((&**right, false));
                    stack.push((&**left, false));
                }
                ClusterNode::Branch { .. } => {
                    let r = results.pop();
                    let l = results.pop();
                    match (l, r) {
                        (Some(l), Some(r)) => results.push(branch(l, r, node)),
                        _ => unreachable!("both children are folded before their branch"),
                    }
                }
            }
        }
        match results.pop() {
            Some(root) => root,
            None => unreachable!("a tree folds to exactly one value"),
        }
    }

    /// Indented text dump for diagnostics.
    ///
    /// Two spaces per level; branches print as `+ <height>`, leaves as
    /// whatever `render` returns for their index.
    pub fn traverse_text<F>(&self, mut render: F) -> String
    where
        F: FnMut(usize) -> String,
    {
        let mut lines = Vec::with_capacity(2 * self.leaf_count() - 1);
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            match node {
                ClusterNode::Leaf { index } => lines.push(format!("{indent}{}", render(*index))),
                ClusterNode::Branch {
                    left,
                    right,
                    height,
                    ..
                } => {
                    lines.push(format!("{indent}+ {height:.3}"));
                    stack.push((&**right, depth + 1));
                    stack.push((&**left, depth + 1));
                }
            }
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Nested fragment mirroring the tree, each leaf replaced by `render`'s
    /// output for its index. Child order is preserved.
    pub fn traverse_markup<T, F>(&self, mut render: F) -> Fragment<T>
    where
        F: FnMut(usize) -> T,
    {
        self.fold(
            &mut |i| Fragment::Leaf(render(i)),
            &mut |l, r, _| Fragment::Pair(Box::new(l), Box::new(r)),
        )
    }
}

impl Drop for ClusterNode {
    fn drop(&mut self) {
        // Detach children onto a heap stack so each node drops with leaf
        // children only.
        let mut stack = Vec::new();
        if let ClusterNode::Branch { left, right, .. } = self {
            stack.push(mem::replace(&mut **left, ClusterNode::leaf(0)));
            stack.push(mem::replace(&mut **right, ClusterNode::leaf(0)));
        }
        while let Some(mut node) = stack.pop() {
            if let ClusterNode::Branch { left, right, .. } = &mut node {
                stack.push(mem::replace(&mut **left, ClusterNode::leaf(0)));
                stack.push(mem::replace(&mut **right, ClusterNode::leaf(0)));
            }
        }
    }
}

impl Serialize for ClusterNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        FlatTree::from(self).serialize(serializer)
    }
}

/// Flat post-order encoding of a [`ClusterNode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatTree {
    nodes: Vec<FlatNode>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum FlatNode {
    Leaf { index: usize },
    Branch { left: usize, right: usize, height: f64 },
}

impl From<&ClusterNode> for FlatTree {
    fn from(root: &ClusterNode) -> Self {
        let mut nodes = Vec::with_capacity(2 * root.leaf_count() - 1);
        let mut ids: Vec<usize> = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            match node {
                ClusterNode::Leaf { index } => {
                    ids.push(nodes.len());
                    nodes.push(FlatNode::Leaf { index: *index });
                }
                ClusterNode::Branch { left, right, .. } if !expanded => {
                    stack.push((node, true));
                    stack.push((&**right, false));
                    stack.push((&**left, false));
                }
                ClusterNode::Branch { height, .. } => {
                    let pair = ids.split_off(ids.len() - 2);
                    ids.push(nodes.len());
                    nodes.push(FlatNode::Branch {
                        left: pair[0],
                        right: pair[1],
                        height: *height,
                    });
                }
            }
        }
        FlatTree { nodes }
    }
}

impl TryFrom<FlatTree> for ClusterNode {
    type Error = Error;

    fn try_from(flat: FlatTree) -> Result<Self> {
        let mut built: Vec<Option<ClusterNode>> = Vec::with_capacity(flat.nodes.len());
        for (at, node) in flat.nodes.into_iter().enumerate() {
            let node = match node {
                FlatNode::Leaf { index } => ClusterNode::leaf(index),
                FlatNode::Branch {
                    left,
                    right,
                    height,
                } => {
                    let mut take = |child: usize| {
                        built
                            .get_mut(child)
                            .and_then(Option::take)
                            .ok_or_else(|| Error::Store(format!("node {at}: bad child {child}")))
                    };
                    let l = take(left)?;
                    let r = take(right)?;
                    ClusterNode::branch(l, r, height)
                }
            };
            built.push(Some(node));
        }

        let root = built
            .pop()
            .flatten()
            .ok_or_else(|| Error::Store("empty tree".into()))?;
        if built.iter().any(Option::is_some) {
            return Err(Error::Store("unreachable nodes in tree".into()));
        }
        Ok(root)
    }
}
