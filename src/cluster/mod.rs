//! Agglomerative clustering from pairwise distances alone.
//!
//! There are no coordinates to average, only a distance matrix, so the
//! algorithm is the classic bottom-up loop:
//!
//! 1. **Find** the globally closest pair of active clusters. Ties go to
//!    the first pair in row-major order (ascending `i`, then `j`).
//! 2. **Merge** them into a branch that owns both, appended at the end of
//!    the forest.
//! 3. **Fold** the matrix: drop the two rows/columns, add one for the
//!    branch.
//! 4. Repeat until one cluster remains.
//!
//! # Linkage
//!
//! The distance from a merged cluster to every other cluster `k` is the
//! Euclidean combination of its constituents' distances:
//!
//! ```text
//! d(i∪j, k) = √(d(i,k)² + d(j,k)²)
//! ```
//!
//! | Linkage | Distance | Effect |
//! |---------|----------|--------|
//! | Single | min | Chaining |
//! | Complete | max | Compact clusters |
//! | Average | mean | Smoothing |
//! | **Pythagorean** | √(a² + b²) | Grows with cluster spread; always ≥ max |
//!
//! Only the Pythagorean rule is implemented. Because a merged distance is
//! never smaller than either input, merge heights are non-decreasing.
//!
//! # Cost
//!
//! N−1 merges, each scanning the active upper triangle: O(N³) time, O(N²)
//! space. The matrix is never copied per merge; see [`Agglomeration`].
//!
//! ## Usage
//!
//! ```rust
//! use fontclust::{Clusterer, DistanceMatrix};
//!
//! let items: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
//! let matrix = DistanceMatrix::from_rows(&[
//!     vec![0.0, 1.0, 10.0, 10.0],
//!     vec![1.0, 0.0, 10.0, 10.0],
//!     vec![10.0, 10.0, 0.0, 2.0],
//!     vec![10.0, 10.0, 2.0, 0.0],
//! ])
//! .unwrap();
//!
//! let root = Clusterer::new().cluster(&items, &matrix).unwrap();
//! assert_eq!(root.leaves(), vec![0, 1, 2, 3]);
//! assert!((root.height() - 20.0).abs() < 1e-9);
//! ```

mod agglomerative;

pub use agglomerative::{
    find_min_pair, pythagorean_linkage, Agglomeration, Clusterer, Clustering,
};
