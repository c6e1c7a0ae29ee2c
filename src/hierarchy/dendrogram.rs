//! Merge history of an agglomerative clustering run.
//!
//! Cluster ids follow the SciPy/MATLAB convention: leaves are `0..n`, and
//! the `i`-th merge creates cluster `n + i`.

use crate::error::{Error, Result};

/// A dendrogram recorded as its merge sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

/// A single merge operation in the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// First cluster being merged (id).
    pub cluster_a: usize,
    /// Second cluster being merged (id).
    pub cluster_b: usize,
    /// Distance at which the merge occurred.
    pub distance: f64,
    /// Size of the resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Create an empty dendrogram over `n_items` leaves.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Record a merge; returns the id of the new cluster.
    pub fn add_merge(&mut self, cluster_a: usize, cluster_b: usize, distance: f64, size: usize) -> usize {
        self.merges.push(Merge {
            cluster_a,
            cluster_b,
            distance,
            size,
        });
        self.n_items + self.merges.len() - 1
    }

    /// Labels after applying the first `n_merges` merges.
    ///
    /// Labels are consecutive, numbered by first appearance in item order.
    fn labels_after(&self, n_merges: usize) -> Vec<usize> {
        let total = self.n_items + self.merges.len();
        let mut parent: Vec<usize> = (0..total).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for (i, m) in self.merges.iter().take(n_merges).enumerate() {
            let id = self.n_items + i;
            let a = find(&mut parent, m.cluster_a);
            let b = find(&mut parent, m.cluster_b);
            parent[a] = id;
            parent[b] = id;
        }

        let mut renumber = vec![usize::MAX; total];
        let mut next = 0;
        (0..self.n_items)
            .map(|item| {
                let root = find(&mut parent, item);
                if renumber[root] == usize::MAX {
                    renumber[root] = next;
                    next += 1;
                }
                renumber[root]
            })
            .collect()
    }

    /// Flat cluster labels from merges at distance `<= threshold`.
    ///
    /// Merge distances are non-decreasing, so this applies a prefix of the
    /// merge sequence.
    pub fn cut_at_distance(&self, threshold: f64) -> Vec<usize> {
        let n = self
            .merges
            .iter()
            .take_while(|m| m.distance <= threshold)
            .count();
        self.labels_after(n)
    }

    /// Flat cluster labels for exactly `k` clusters.
    pub fn cut_to_k(&self, k: usize) -> Result<Vec<usize>> {
        if k == 0 || k > self.n_items {
            return Err(Error::DimensionMismatch {
                expected: self.n_items,
                found: k,
            });
        }
        let n_merges = self.n_items - k;
        if n_merges > self.merges.len() {
            return Err(Error::EmptyForest {
                active: self.n_items - self.merges.len(),
            });
        }
        Ok(self.labels_after(n_merges))
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Iterate over merges.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge distances in merge order.
    pub fn distances(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }
}
