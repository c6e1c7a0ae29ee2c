//! Agglomerative clustering over a precomputed distance matrix.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hierarchy::{ClusterNode, Dendrogram, Merge};
use crate::matrix::DistanceMatrix;

/// Distance from a merged cluster to a third cluster `k`, given the two
/// constituents' distances `a = d(i,k)` and `b = d(j,k)`:
///
/// ```text
/// d(i∪j, k) = √(a² + b²)
/// ```
#[inline]
pub fn pythagorean_linkage(a: f64, b: f64) -> f64 {
    (a * a + b * b).sqrt()
}

/// Globally closest pair `(i, j)`, `i < j`, in `matrix`.
///
/// Ties go to the first pair in row-major order over the upper triangle.
/// `None` if the matrix has fewer than two rows.
pub fn find_min_pair(matrix: &DistanceMatrix) -> Option<(usize, usize)> {
    min_pair_by(matrix.len(), |i, j| matrix.get(i, j)).map(|(i, j, _)| (i, j))
}

fn min_pair_by<D>(n: usize, dist: D) -> Option<(usize, usize, f64)>
where
    D: Fn(usize, usize) -> f64,
{
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..n {
        for j in i + 1..n {
            let d = dist(i, j);
            // Strict `<`: an equal later pair never displaces the first.
            if best.map_or(true, |(_, _, b)| d < b) {
                best = Some((i, j, d));
            }
        }
    }
    best
}

/// One active cluster in the forest.
#[derive(Debug)]
struct Tree {
    /// Row/column of the backing matrix holding this cluster's distances.
    slot: usize,
    /// Dendrogram id.
    id: usize,
    node: ClusterNode,
}

/// In-progress clustering: the forest plus its distance matrix.
///
/// The matrix is kept as an active set over the original N×N buffer rather
/// than being rebuilt per merge. A merged branch reuses the slot of its left
/// child and the right child's slot goes dead. Forest order, and with it
/// tie-breaking, is the same as if the two rows and columns were deleted and
/// one new row and column appended.
#[derive(Debug)]
pub struct Agglomeration {
    backing: DistanceMatrix,
    forest: Vec<Tree>,
    dendrogram: Dendrogram,
}

impl Agglomeration {
    /// Start with one leaf per item.
    pub fn new(matrix: DistanceMatrix) -> Self {
        let n = matrix.len();
        Self {
            forest: (0..n)
                .map(|i| Tree {
                    slot: i,
                    id: i,
                    node: ClusterNode::leaf(i),
                })
                .collect(),
            backing: matrix,
            dendrogram: Dendrogram::new(n),
        }
    }

    /// Number of active clusters.
    pub fn active(&self) -> usize {
        self.forest.len()
    }

    /// True once a single cluster remains.
    pub fn is_done(&self) -> bool {
        self.forest.len() <= 1
    }

    /// Distance between forest positions `p` and `q`.
    #[inline]
    pub fn distance(&self, p: usize, q: usize) -> f64 {
        self.backing.get(self.forest[p].slot, self.forest[q].slot)
    }

    /// Compacted matrix over the active clusters, in forest order.
    pub fn current_matrix(&self) -> DistanceMatrix {
        let n = self.forest.len();
        let mut m = DistanceMatrix::zeros(n);
        for p in 0..n {
            for q in p + 1..n {
                m.set(p, q, self.distance(p, q));
            }
        }
        m
    }

    /// Active cluster nodes, in forest order.
    pub fn forest(&self) -> impl Iterator<Item = &ClusterNode> {
        self.forest.iter().map(|t| &t.node)
    }

    /// Merge the closest pair and fold the matrix.
    pub fn step(&mut self) -> Result<Merge> {
        let (p, q, d) = min_pair_by(self.forest.len(), |p, q| self.distance(p, q)).ok_or(
            Error::EmptyForest {
                active: self.forest.len(),
            },
        )?;

        // q > p, so removing q first leaves p in place.
        let right = self.forest.remove(q);
        let left = self.forest.remove(p);

        for k in &self.forest {
            let a = self.backing.get(left.slot, k.slot);
            let b = self.backing.get(right.slot, k.slot);
            self.backing.set(left.slot, k.slot, pythagorean_linkage(a, b));
        }

        let node = ClusterNode::branch(left.node, right.node, d);
        let size = node.leaf_count();
        let id = self.dendrogram.add_merge(left.id, right.id, d, size);
        debug!(left = p, right = q, distance = d, size, remaining = self.forest.len() + 1, "merge");

        self.forest.push(Tree {
            slot: left.slot,
            id,
            node,
        });

        Ok(Merge {
            cluster_a: left.id,
            cluster_b: right.id,
            distance: d,
            size,
        })
    }

    /// Merge until one cluster remains.
    pub fn run(mut self) -> Result<Clustering> {
        if self.forest.is_empty() {
            return Err(Error::EmptyInput);
        }
        while !self.is_done() {
            self.step()?;
        }
        let root = self
            .forest
            .pop()
            .map(|t| t.node)
            .ok_or(Error::EmptyForest { active: 0 })?;
        Ok(Clustering {
            root,
            dendrogram: self.dendrogram,
        })
    }
}

/// Result of a full clustering run.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Tree root.
    pub root: ClusterNode,
    /// Merge sequence that built `root`.
    pub dendrogram: Dendrogram,
}

/// Agglomerative clusterer with Pythagorean linkage.
///
/// Repeatedly merges the globally closest pair of clusters. Cost is O(N³)
/// time (N−1 scans over a shrinking active set) and O(N²) space.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clusterer;

impl Clusterer {
    /// Create a clusterer.
    pub fn new() -> Self {
        Self
    }

    /// Cluster `items` and return the tree root.
    pub fn cluster(&self, items: &[String], matrix: &DistanceMatrix) -> Result<ClusterNode> {
        Ok(self.cluster_with_dendrogram(items, matrix)?.root)
    }

    /// Cluster `items`, returning the root and the merge history.
    pub fn cluster_with_dendrogram(
        &self,
        items: &[String],
        matrix: &DistanceMatrix,
    ) -> Result<Clustering> {
        if items.len() != matrix.len() {
            return Err(Error::DimensionMismatch {
                expected: items.len(),
                found: matrix.len(),
            });
        }
        if items.is_empty() {
            return Err(Error::EmptyInput);
        }
        info!(items = items.len(), merges = items.len() - 1, "clustering");
        Agglomeration::new(matrix.clone()).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    fn scenario_a() -> DistanceMatrix {
        DistanceMatrix::from_rows(&[
            vec![0.0, 1.0, 10.0, 10.0],
            vec![1.0, 0.0, 10.0, 10.0],
            vec![10.0, 10.0, 0.0, 2.0],
            vec![10.0, 10.0, 2.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_linkage_formula() {
        assert!((pythagorean_linkage(3.0, 4.0) - 5.0).abs() < EPS);
        assert_eq!(pythagorean_linkage(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_min_pair_tie_breaks_row_major() {
        let m = DistanceMatrix::from_rows(&[
            vec![0.0, 5.0, 2.0, 2.0],
            vec![5.0, 0.0, 2.0, 9.0],
            vec![2.0, 2.0, 0.0, 2.0],
            vec![2.0, 9.0, 2.0, 0.0],
        ])
        .unwrap();
        assert_eq!(find_min_pair(&m), Some((0, 2)));
    }

    #[test]
    fn test_min_pair_needs_two() {
        assert_eq!(find_min_pair(&DistanceMatrix::zeros(1)), None);
        assert_eq!(find_min_pair(&DistanceMatrix::zeros(0)), None);
        // All-zero still yields the first pair.
        assert_eq!(find_min_pair(&DistanceMatrix::zeros(3)), Some((0, 1)));
    }

    #[test]
    fn test_scenario_a_merge_sequence() {
        let mut agg = Agglomeration::new(scenario_a());

        let m1 = agg.step().unwrap();
        assert_eq!((m1.cluster_a, m1.cluster_b, m1.size), (0, 1, 2));
        assert_eq!(m1.distance, 1.0);

        // Forest is now [C, D, AB].
        let cur = agg.current_matrix();
        assert_eq!(cur.len(), 3);
        assert_eq!(cur.get(0, 1), 2.0);
        assert!((cur.get(0, 2) - 200f64.sqrt()).abs() < EPS);
        assert!((cur.get(1, 2) - 200f64.sqrt()).abs() < EPS);
        assert!(cur.is_symmetric());

        let m2 = agg.step().unwrap();
        assert_eq!((m2.cluster_a, m2.cluster_b), (2, 3));
        assert_eq!(m2.distance, 2.0);

        // Forest is now [AB, CD].
        let cur = agg.current_matrix();
        assert!((cur.get(0, 1) - 20.0).abs() < EPS);

        let m3 = agg.step().unwrap();
        assert_eq!((m3.cluster_a, m3.cluster_b, m3.size), (4, 5, 4));
        assert!(agg.is_done());
        assert!(matches!(agg.step(), Err(Error::EmptyForest { active: 1 })));
    }

    #[test]
    fn test_scenario_a_tree_shape() {
        let root = Clusterer::new().cluster(&names(4), &scenario_a()).unwrap();
        let expected = ClusterNode::branch(
            ClusterNode::branch(ClusterNode::leaf(0), ClusterNode::leaf(1), 1.0),
            ClusterNode::branch(ClusterNode::leaf(2), ClusterNode::leaf(3), 2.0),
            root.height(),
        );
        assert_eq!(root, expected);
        assert!((root.height() - 20.0).abs() < EPS);
    }

    #[test]
    fn test_single_item_is_leaf() {
        let out = Clusterer::new()
            .cluster_with_dendrogram(&names(1), &DistanceMatrix::zeros(1))
            .unwrap();
        assert_eq!(out.root, ClusterNode::leaf(0));
        assert_eq!(out.dendrogram.n_merges(), 0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let c = Clusterer::new();
        assert!(matches!(
            c.cluster(&[], &DistanceMatrix::zeros(0)),
            Err(Error::EmptyInput)
        ));
        assert!(matches!(
            c.cluster(&names(2), &DistanceMatrix::zeros(3)),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_new_branch_goes_last() {
        // 2 and 3 merge first; the forest becomes [0, 1, (2,3)] and 0-1 (3.0)
        // beats both √(a²+b²) distances. (0,1) then lands after (2,3).
        let m = DistanceMatrix::from_rows(&[
            vec![0.0, 3.0, 4.0, 4.0],
            vec![3.0, 0.0, 4.0, 4.0],
            vec![4.0, 4.0, 0.0, 1.0],
            vec![4.0, 4.0, 1.0, 0.0],
        ])
        .unwrap();
        let out = Clusterer::new().cluster_with_dendrogram(&names(4), &m).unwrap();
        let merges: Vec<_> = out.dendrogram.merges().map(|m| (m.cluster_a, m.cluster_b)).collect();
        assert_eq!(merges, vec![(2, 3), (0, 1), (4, 5)]);
        assert_eq!(out.root.leaves(), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_dendrogram_cut_matches_tree() {
        let out = Clusterer::new()
            .cluster_with_dendrogram(&names(4), &scenario_a())
            .unwrap();
        assert_eq!(out.dendrogram.cut_to_k(2).unwrap(), vec![0, 0, 1, 1]);
    }

    fn arb_matrix() -> impl Strategy<Value = DistanceMatrix> {
        (2usize..12).prop_flat_map(|n| {
            proptest::collection::vec(0.0f64..100.0, n * (n - 1) / 2).prop_map(move |upper| {
                let mut m = DistanceMatrix::zeros(n);
                let mut k = 0;
                for i in 0..n {
                    for j in i + 1..n {
                        m.set(i, j, upper[k]);
                        k += 1;
                    }
                }
                m
            })
        })
    }

    /// Straight transcription of the fold: delete both rows/columns, append one.
    fn naive_fold(m: &DistanceMatrix, i: usize, j: usize) -> DistanceMatrix {
        let keep: Vec<usize> = (0..m.len()).filter(|&k| k != i && k != j).collect();
        let mut out = DistanceMatrix::zeros(keep.len() + 1);
        for (a, &ka) in keep.iter().enumerate() {
            for (b, &kb) in keep.iter().enumerate().skip(a + 1) {
                out.set(a, b, m.get(ka, kb));
            }
            out.set(a, keep.len(), pythagorean_linkage(m.get(i, ka), m.get(j, ka)));
        }
        out
    }

    proptest! {
        #[test]
        fn fold_matches_naive_and_stays_symmetric(m in arb_matrix()) {
            let n = m.len();
            let mut agg = Agglomeration::new(m.clone());
            let mut naive = m;
            for step in 0..n - 1 {
                prop_assert_eq!(agg.active(), n - step);
                let (i, j) = find_min_pair(&naive).unwrap();
                agg.step().unwrap();
                naive = naive_fold(&naive, i, j);

                let cur = agg.current_matrix();
                prop_assert!(cur.is_symmetric());
                prop_assert_eq!(cur.len(), naive.len());
                for p in 0..cur.len() {
                    for q in 0..cur.len() {
                        prop_assert!((cur.get(p, q) - naive.get(p, q)).abs() < 1e-9);
                    }
                }
            }
            prop_assert!(agg.is_done());
        }

        #[test]
        fn exactly_n_minus_one_merges(m in arb_matrix()) {
            let n = m.len();
            let out = Clusterer::new().cluster_with_dendrogram(&names(n), &m).unwrap();
            prop_assert_eq!(out.dendrogram.n_merges(), n - 1);
            prop_assert_eq!(out.root.leaf_count(), n);
            prop_assert!(out.root.covers(n));
            let d = out.dendrogram.distances();
            prop_assert!(d.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
