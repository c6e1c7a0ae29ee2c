//! Cluster trees and their merge history.
//!
//! Agglomerative clustering yields a binary tree whose leaves are the
//! original items:
//!
//! ```text
//!         6 (height=20.0)
//!        / \
//!       4   5 (height=1.0, 2.0)
//!      / \ / \
//!     A  B C  D (leaves)
//! ```
//!
//! Two views of the same run are kept:
//!
//! - [`ClusterNode`]: the owned tree itself. Leaves wrap an item index,
//!   branches own their two children. This is what gets persisted and what
//!   report generators walk, via [`ClusterNode::traverse_markup`] (a
//!   [`Fragment`] per tree) or [`ClusterNode::traverse_text`] (diagnostics).
//! - [`Dendrogram`]: the flat merge sequence with SciPy-style cluster ids,
//!   which can be cut into `k` flat clusters.
//!
//! Child order is significant. `left` is the cluster that preceded `right`
//! in the forest at merge time, and that order shows up in every rendering.

mod dendrogram;
mod fragment;
mod node;

pub use dendrogram::{Dendrogram, Merge};
pub use fragment::Fragment;
pub use node::{ClusterNode, FlatTree};
