//! Persisted intermediate results.
//!
//! Building the matrix can take hours, so the pipeline keeps two JSON blobs:
//!
//! - a [`MatrixSnapshot`]: the item list and its distance matrix, as built
//! - the clustered [`ClusterNode`] tree
//!
//! Loading is an optimization, never a source of truth. Under the default
//! [`LoadPolicy::FallbackToRebuild`], *any* failure (missing file, unreadable
//! file, bad JSON, a snapshot whose parts disagree) is reported as a miss and
//! the caller recomputes. The cause is logged and otherwise dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::hierarchy::ClusterNode;
use crate::matrix::DistanceMatrix;

/// What to do when a persisted blob cannot be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPolicy {
    /// Every load failure is a cache miss.
    #[default]
    FallbackToRebuild,
    /// An absent blob is a miss; anything else is an error.
    Strict,
}

/// Items and their distance matrix, as persisted after a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    /// Items, in matrix order.
    pub items: Vec<String>,
    /// Distances between `items`.
    pub matrix: DistanceMatrix,
}

impl MatrixSnapshot {
    /// Pair a list with its matrix.
    pub fn new(items: Vec<String>, matrix: DistanceMatrix) -> Result<Self> {
        let snapshot = Self { items, matrix };
        snapshot.check()?;
        Ok(snapshot)
    }

    fn check(&self) -> Result<()> {
        if self.items.len() != self.matrix.len() {
            return Err(Error::Store(format!(
                "snapshot has {} items but a {}×{} matrix",
                self.items.len(),
                self.matrix.len(),
                self.matrix.len()
            )));
        }
        Ok(())
    }
}

/// Reads and writes the two blobs under one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    matrix_file: String,
    tree_file: String,
    policy: LoadPolicy,
}

impl SnapshotStore {
    /// Store rooted at `dir` with default file names.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            matrix_file: "matrix.json".into(),
            tree_file: "tree.json".into(),
            policy: LoadPolicy::default(),
        }
    }

    /// Set the blob file names.
    pub fn with_files(mut self, matrix_file: impl Into<String>, tree_file: impl Into<String>) -> Self {
        self.matrix_file = matrix_file.into();
        self.tree_file = tree_file.into();
        self
    }

    /// Set the load policy.
    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Path of the matrix blob.
    pub fn matrix_path(&self) -> PathBuf {
        self.dir.join(&self.matrix_file)
    }

    /// Path of the tree blob.
    pub fn tree_path(&self) -> PathBuf {
        self.dir.join(&self.tree_file)
    }

    /// Load the matrix snapshot; `Ok(None)` on a miss.
    pub fn load_matrix(&self) -> Result<Option<MatrixSnapshot>> {
        let path = self.matrix_path();
        let loaded = read_json::<MatrixSnapshot>(&path).and_then(|s| match s {
            Some(s) => s.check().map(|_| Some(s)),
            None => Ok(None),
        });
        self.settle(loaded, &path)
    }

    /// Persist the matrix snapshot.
    pub fn save_matrix(&self, snapshot: &MatrixSnapshot) -> Result<()> {
        write_json(&self.matrix_path(), snapshot)
    }

    /// Load the tree; `Ok(None)` on a miss.
    pub fn load_tree(&self) -> Result<Option<ClusterNode>> {
        let path = self.tree_path();
        let loaded = read_json::<ClusterNode>(&path);
        self.settle(loaded, &path)
    }

    /// Persist the tree.
    pub fn save_tree(&self, tree: &ClusterNode) -> Result<()> {
        write_json(&self.tree_path(), tree)
    }

    fn settle<T>(&self, loaded: Result<Option<T>>, path: &Path) -> Result<Option<T>> {
        match loaded {
            Ok(Some(v)) => {
                info!(path = %path.display(), "loaded from cache");
                Ok(Some(v))
            }
            Ok(None) => {
                info!(path = %path.display(), "no cached blob");
                Ok(None)
            }
            Err(e) if self.policy == LoadPolicy::FallbackToRebuild => {
                warn!(path = %path.display(), error = %e, "cache load failed, rebuilding");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // Write beside the target and rename, so a crash never leaves half a blob.
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec(value)?)?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), "saved to cache");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MatrixSnapshot {
        MatrixSnapshot::new(
            vec!["a".into(), "b".into()],
            DistanceMatrix::from_rows(&[vec![0.0, 1.5], vec![1.5, 0.0]]).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_matrix_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested"));
        assert!(store.load_matrix().unwrap().is_none());
        store.save_matrix(&snapshot()).unwrap();
        assert_eq!(store.load_matrix().unwrap(), Some(snapshot()));
    }

    #[test]
    fn test_tree_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).with_files("m.json", "t.json");
        let tree = ClusterNode::branch(ClusterNode::leaf(1), ClusterNode::leaf(0), 3.0);
        store.save_tree(&tree).unwrap();
        assert!(store.tree_path().ends_with("t.json"));
        assert_eq!(store.load_tree().unwrap(), Some(tree));
    }

    #[test]
    fn test_distances_reload_bit_exact() {
        // Values whose shortest decimal form needs all 17 digits.
        let n = 40;
        let mut matrix = DistanceMatrix::zeros(n);
        let mut k = 1.0f64;
        for i in 0..n {
            for j in i + 1..n {
                matrix.set(i, j, k.sqrt() * 7.123456789);
                k += 1.0;
            }
        }
        let items = (0..n).map(|i| format!("font-{i}")).collect();
        let snapshot = MatrixSnapshot::new(items, matrix).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save_matrix(&snapshot).unwrap();
        let loaded = store.load_matrix().unwrap().unwrap();
        for i in 0..n {
            for j in 0..n {
                assert_eq!(
                    loaded.matrix.get(i, j).to_bits(),
                    snapshot.matrix.get(i, j).to_bits(),
                    "({i}, {j})"
                );
            }
        }

        let tree = ClusterNode::branch(
            ClusterNode::leaf(0),
            ClusterNode::leaf(1),
            21.118712081942874,
        );
        store.save_tree(&tree).unwrap();
        let back = store.load_tree().unwrap().unwrap();
        assert_eq!(back.height().to_bits(), tree.height().to_bits());
    }

    #[test]
    fn test_corrupt_blob_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(store.matrix_path(), b"not json").unwrap();
        fs::write(store.tree_path(), br#"{"nodes":[]}"#).unwrap();
        assert!(store.load_matrix().unwrap().is_none());
        assert!(store.load_tree().unwrap().is_none());
    }

    #[test]
    fn test_mismatched_snapshot_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(
            store.matrix_path(),
            br#"{"items":["a","b","c"],"matrix":[[0.0,1.0],[1.0,0.0]]}"#,
        )
        .unwrap();
        assert!(store.load_matrix().unwrap().is_none());
        assert!(MatrixSnapshot::new(vec!["a".into()], DistanceMatrix::zeros(2)).is_err());
    }

    #[test]
    fn test_strict_policy_surfaces_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).with_policy(LoadPolicy::Strict);
        assert!(store.load_tree().unwrap().is_none());
        fs::write(store.tree_path(), b"{").unwrap();
        assert!(matches!(store.load_tree(), Err(Error::Serialization(_))));
    }
}
