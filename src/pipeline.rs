//! End-to-end run: build or load the matrix, sanitize, build or load the tree.
//!
//! ```text
//! items ──► MatrixBuilder ──► (items, matrix) ──► Sanitizer ──► Clusterer ──► ClusterNode
//!               │  ▲                                                 │  ▲
//!               ▼  │ matrix.json                           tree.json ▼  │
//!              SnapshotStore ◄───────────────────────────────────────────┘
//! ```
//!
//! A persisted matrix replaces both the item list and the build. The
//! sanitizer always runs on whatever was loaded or built. A persisted tree
//! is only used if its leaves are exactly the sanitized items.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cluster::Clusterer;
use crate::error::Result;
use crate::hierarchy::ClusterNode;
use crate::matrix::{CacheBudget, DistanceMatrix, DistanceOracle, EvictionPolicy, MatrixBuilder, Renderer};
use crate::sanitize::{ResourceLookup, SanitizeReport, Sanitizer};
use crate::store::{LoadPolicy, MatrixSnapshot, SnapshotStore};

/// Configuration for a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the persisted blobs.
    pub cache_dir: PathBuf,
    /// File name of the matrix blob.
    pub matrix_file: String,
    /// File name of the tree blob.
    pub tree_file: String,
    /// Render cache budget for the matrix build.
    pub budget: CacheBudget,
    /// Render cache eviction policy.
    pub eviction: EvictionPolicy,
    /// What to do when a blob fails to load.
    pub load_policy: LoadPolicy,
    /// Read and write persisted blobs at all.
    pub use_cache: bool,
    /// Drop items with a null rendering before building.
    pub skip_null: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            matrix_file: "matrix.json".into(),
            tree_file: "tree.json".into(),
            budget: CacheBudget::default(),
            eviction: EvictionPolicy::default(),
            load_policy: LoadPolicy::default(),
            use_cache: true,
            skip_null: true,
        }
    }
}

impl PipelineConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the render cache budget.
    pub fn with_budget(mut self, budget: CacheBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the eviction policy.
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Set the load policy.
    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    /// Enable or disable persisted blobs.
    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Enable or disable the null-rendering filter.
    pub fn with_skip_null(mut self, skip_null: bool) -> Self {
        self.skip_null = skip_null;
        self
    }
}

/// Everything a report generator needs.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Sanitized items; leaf `i` of `tree` is `items[i]`.
    pub items: Vec<String>,
    /// Sanitized matrix over `items`.
    pub matrix: DistanceMatrix,
    /// Cluster tree root.
    pub tree: ClusterNode,
    /// What the sanitizer removed.
    pub report: SanitizeReport,
    /// True if the matrix was built rather than loaded.
    pub built_matrix: bool,
    /// True if the tree was built rather than loaded.
    pub built_tree: bool,
}

/// Runs the full clustering pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    store: SnapshotStore,
}

impl Pipeline {
    /// Create a pipeline from `config`.
    pub fn new(config: PipelineConfig) -> Self {
        let store = SnapshotStore::new(&config.cache_dir)
            .with_files(&config.matrix_file, &config.tree_file)
            .with_policy(config.load_policy);
        Self { config, store }
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Cluster `items`.
    pub fn run<R, O, L>(
        &self,
        items: Vec<String>,
        renderer: &R,
        oracle: &O,
        lookup: &L,
    ) -> Result<PipelineOutput>
    where
        R: Renderer + ?Sized,
        O: DistanceOracle<R::Output> + ?Sized,
        L: ResourceLookup + ?Sized,
    {
        let (mut items, mut matrix, built_matrix) = match self.cached_matrix()? {
            Some(snapshot) => (snapshot.items, snapshot.matrix, false),
            None => {
                let (items, matrix) = self.build_matrix(items, renderer, oracle)?;
                (items, matrix, true)
            }
        };

        let report = Sanitizer::new().run(&mut items, &mut matrix, lookup)?;
        info!(items = items.len(), "after sanitizing");

        let (tree, built_tree) = match self.cached_tree(items.len())? {
            Some(tree) => (tree, false),
            None => {
                let tree = Clusterer::new().cluster(&items, &matrix)?;
                if self.config.use_cache {
                    self.store.save_tree(&tree)?;
                }
                (tree, true)
            }
        };

        Ok(PipelineOutput {
            items,
            matrix,
            tree,
            report,
            built_matrix,
            built_tree,
        })
    }

    fn cached_matrix(&self) -> Result<Option<MatrixSnapshot>> {
        if !self.config.use_cache {
            return Ok(None);
        }
        self.store.load_matrix()
    }

    fn cached_tree(&self, n: usize) -> Result<Option<ClusterNode>> {
        if !self.config.use_cache {
            return Ok(None);
        }
        match self.store.load_tree()? {
            Some(tree) if tree.covers(n) => Ok(Some(tree)),
            Some(tree) => {
                warn!(
                    leaves = tree.leaf_count(),
                    items = n,
                    "cached tree does not match items, rebuilding"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn build_matrix<R, O>(
        &self,
        items: Vec<String>,
        renderer: &R,
        oracle: &O,
    ) -> Result<(Vec<String>, DistanceMatrix)>
    where
        R: Renderer + ?Sized,
        O: DistanceOracle<R::Output> + ?Sized,
    {
        let builder = MatrixBuilder::new()
            .with_budget(self.config.budget)
            .with_eviction(self.config.eviction);

        let items = if self.config.skip_null {
            builder.retain_renderable(items, renderer)?
        } else {
            items
        };

        // Log at every tenth of the way.
        let mut next_tenth = 1;
        let matrix = builder.build_with_progress(&items, renderer, oracle, |p| {
            if p.fraction() * 10.0 >= next_tenth as f64 {
                info!(
                    percent = next_tenth * 10,
                    done = p.done,
                    total = p.total,
                    rows_left = p.remaining_rows,
                    "matrix progress"
                );
                next_tenth += 1;
            }
        })?;

        if self.config.use_cache {
            let snapshot = MatrixSnapshot::new(items, matrix)?;
            self.store.save_matrix(&snapshot)?;
            return Ok((snapshot.items, snapshot.matrix));
        }
        Ok((items, matrix))
    }
}
