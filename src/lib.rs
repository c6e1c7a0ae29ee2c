//! # fontclust
//!
//! Groups font faces (or any named items) by visual similarity using only
//! pairwise distances, and produces a binary merge tree over them.
//!
//! There is no embedding: an external oracle scores two rendered items, and
//! everything downstream works from the resulting N×N matrix.
//!
//! ```text
//! items ─► MatrixBuilder ─► DistanceMatrix ─► Sanitizer ─► Clusterer ─► ClusterNode
//!           (Renderer + RenderCache           (zero rows,   (Pythagorean    (traverse_markup
//!            + DistanceOracle)                 missing)      linkage)        → report)
//! ```
//!
//! - [`matrix`]: symmetric distance matrices and the bounded render cache
//! - [`sanitize`]: removal of degenerate and unbacked items
//! - [`cluster`]: agglomerative merging
//! - [`hierarchy`]: the resulting tree, its fragments and merge history
//! - [`store`] / [`pipeline`]: persisted intermediates and the end-to-end run
//!
//! **Default build** is sequential. The `parallel` feature adds a rayon
//! matrix build.

/// Error types used across `fontclust`.
pub mod error;
pub mod cluster;
pub mod hierarchy;
pub mod matrix;
pub mod pipeline;
pub mod sanitize;
pub mod store;

#[cfg(test)]
mod pipeline_tests;

pub use cluster::{find_min_pair, pythagorean_linkage, Agglomeration, Clusterer, Clustering};
pub use error::{Error, Result};
pub use hierarchy::{ClusterNode, Dendrogram, Fragment, Merge};
pub use matrix::{
    CacheBudget, DistanceMatrix, DistanceOracle, EvictionPolicy, MatrixBuilder, Progress,
    RenderCache, Renderer,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
pub use sanitize::{remove_missing, remove_zero_rows, ResourceLookup, SanitizeReport, Sanitizer};
pub use store::{LoadPolicy, MatrixSnapshot, SnapshotStore};
