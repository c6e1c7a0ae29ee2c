//! Symmetric all-pairs distance matrices.
//!
//! Items are only known through pairwise dissimilarities, so the whole
//! pipeline works on an N×N matrix indexed by position in an ordered item
//! list:
//!
//! ```text
//!        A     B     C     D
//!   A  0.0   1.0  10.0  10.0
//!   B  1.0   0.0  10.0  10.0
//!   C 10.0  10.0   0.0   2.0
//!   D 10.0  10.0   2.0   0.0
//! ```
//!
//! Two invariants hold for every matrix this crate hands out:
//!
//! - `m[i][i] == 0`
//! - `m[i][j] == m[j][i]`
//!
//! [`DistanceMatrix::set`] writes both halves at once and
//! [`DistanceMatrix::remove`] deletes a row and its column together, so
//! neither operation can break them.
//!
//! # Building
//!
//! [`MatrixBuilder`] drives an external [`DistanceOracle`] over every
//! unordered pair, fetching renderings through a [`RenderCache`] whose
//! memory is bounded by a [`CacheBudget`].

pub mod builder;
pub mod cache;

pub use builder::{DistanceOracle, MatrixBuilder, Progress, Renderer};
pub use cache::{CacheBudget, EvictionPolicy, RenderCache};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Dense symmetric distance matrix with a zero diagonal.
///
/// Stored row-major in a flat buffer. Serializes as nested rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<f64>>", try_from = "Vec<Vec<f64>>")]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// An `n`×`n` matrix of zeros.
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// Build from nested rows.
    ///
    /// Rows must be square. Only the upper triangle is read; the lower
    /// triangle is mirrored from it and the diagonal is forced to zero.
    /// Upper-triangle entries must be finite and nonnegative.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if let Some(row) = rows.iter().find(|r| r.len() != n) {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: row.len(),
            });
        }

        let mut m = Self::zeros(n);
        for (i, row) in rows.iter().enumerate() {
            for (j, &d) in row.iter().enumerate().skip(i + 1) {
                check_distance(i, j, d)?;
                m.set(i, j, d);
            }
        }
        Ok(m)
    }

    /// Dimension N.
    pub fn len(&self) -> usize {
        self.n
    }

    /// True for the 0×0 matrix.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between positions `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// Write `d` into both `[i][j]` and `[j][i]`.
    ///
    /// Writes to the diagonal are ignored.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, d: f64) {
        if i == j {
            return;
        }
        self.data[i * self.n + j] = d;
        self.data[j * self.n + i] = d;
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Iterate rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks() panics on zero; an empty matrix has no rows anyway.
        self.data.chunks(self.n.max(1))
    }

    /// Delete row `i` and column `i`, shrinking the matrix by one.
    pub fn remove(&mut self, i: usize) {
        assert!(i < self.n, "row {i} out of bounds for {}×{}", self.n, self.n);
        let n = self.n;
        let mut data = Vec::with_capacity((n - 1) * (n - 1));
        for r in (0..n).filter(|&r| r != i) {
            let row = &self.data[r * n..(r + 1) * n];
            data.extend_from_slice(&row[..i]);
            data.extend_from_slice(&row[i + 1..]);
        }
        self.n = n - 1;
        self.data = data;
    }

    /// True if every entry of row `i`, diagonal included, is zero.
    pub fn row_is_zero(&self, i: usize) -> bool {
        self.row(i).iter().all(|&d| d == 0.0)
    }

    /// Check the symmetry and zero-diagonal invariants.
    pub fn is_symmetric(&self) -> bool {
        (0..self.n).all(|i| {
            self.get(i, i) == 0.0 && (i + 1..self.n).all(|j| self.get(i, j) == self.get(j, i))
        })
    }

    /// Copy out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.n == 0 {
            return Vec::new();
        }
        self.rows().map(<[f64]>::to_vec).collect()
    }
}

impl From<DistanceMatrix> for Vec<Vec<f64>> {
    fn from(m: DistanceMatrix) -> Self {
        m.to_rows()
    }
}

impl TryFrom<Vec<Vec<f64>>> for DistanceMatrix {
    type Error = Error;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(&rows)
    }
}

/// Reject distances that are negative, NaN or infinite.
pub(crate) fn check_distance(i: usize, j: usize, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidDistance { i, j, value })
    }
}
