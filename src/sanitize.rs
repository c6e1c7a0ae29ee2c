//! Pre-clustering removal of unusable items.
//!
//! Two filters, both shrinking the item list and the matrix in lockstep:
//!
//! - **zero rows**: an item whose entire row, diagonal included, is zero.
//!   Every item has a zero diagonal, so this only fires when all of its
//!   cross-distances are zero too, which points at a degenerate oracle result.
//! - **missing resources**: an item whose backing resource (a font file,
//!   say) can no longer be located.
//!
//! Neither is an error. The item is dropped, the removal is logged and
//! processing continues. Both filters scan from the last index down to 0 so
//! that a removal never shifts an index still to be visited.

use tracing::info;

use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;

/// Existence check for the resource backing an item.
pub trait ResourceLookup {
    /// True if `id` still has a backing resource.
    fn exists(&self, id: &str) -> bool;
}

impl<F> ResourceLookup for F
where
    F: Fn(&str) -> bool,
{
    fn exists(&self, id: &str) -> bool {
        self(id)
    }
}

/// Items removed by a [`Sanitizer`] pass, in removal order (highest index first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Removed for an all-zero distance row.
    pub zero_rows: Vec<String>,
    /// Removed for a missing backing resource.
    pub missing: Vec<String>,
}

impl SanitizeReport {
    /// Total removals.
    pub fn removed(&self) -> usize {
        self.zero_rows.len() + self.missing.len()
    }
}

/// Runs the zero-row filter, then the missing-resource filter.
#[derive(Debug, Clone, Copy)]
pub struct Sanitizer {
    zero_rows: bool,
    missing: bool,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            zero_rows: true,
            missing: true,
        }
    }
}

impl Sanitizer {
    /// Sanitizer with both filters enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the zero-row filter.
    pub fn with_zero_rows(mut self, enabled: bool) -> Self {
        self.zero_rows = enabled;
        self
    }

    /// Enable or disable the missing-resource filter.
    pub fn with_missing(mut self, enabled: bool) -> Self {
        self.missing = enabled;
        self
    }

    /// Apply the enabled filters in place.
    pub fn run<L>(
        &self,
        items: &mut Vec<String>,
        matrix: &mut DistanceMatrix,
        lookup: &L,
    ) -> Result<SanitizeReport>
    where
        L: ResourceLookup + ?Sized,
    {
        let mut report = SanitizeReport::default();
        if self.zero_rows {
            report.zero_rows = remove_zero_rows(items, matrix)?;
        }
        if self.missing {
            report.missing = remove_missing(items, matrix, lookup)?;
        }
        info!(
            remaining = items.len(),
            zero_rows = report.zero_rows.len(),
            missing = report.missing.len(),
            "sanitized"
        );
        Ok(report)
    }
}

/// Remove every item whose matrix row is entirely zero.
///
/// Returns the removed items.
pub fn remove_zero_rows(items: &mut Vec<String>, matrix: &mut DistanceMatrix) -> Result<Vec<String>> {
    remove_where(items, matrix, |_, m, i| m.row_is_zero(i), "all-zero-distance")
}

/// Remove every item whose backing resource `lookup` cannot find.
///
/// Returns the removed items.
pub fn remove_missing<L>(
    items: &mut Vec<String>,
    matrix: &mut DistanceMatrix,
    lookup: &L,
) -> Result<Vec<String>>
where
    L: ResourceLookup + ?Sized,
{
    remove_where(items, matrix, |id, _, _| !lookup.exists(id), "no backing resource")
}

fn remove_where<F>(
    items: &mut Vec<String>,
    matrix: &mut DistanceMatrix,
    mut doomed: F,
    reason: &str,
) -> Result<Vec<String>>
where
    F: FnMut(&str, &DistanceMatrix, usize) -> bool,
{
    if items.len() != matrix.len() {
        return Err(Error::DimensionMismatch {
            expected: items.len(),
            found: matrix.len(),
        });
    }

    let mut removed = Vec::new();
    for i in (0..items.len()).rev() {
        if doomed(&items[i], matrix, i) {
            let id = items.remove(i);
            matrix.remove(i);
            info!(item = %id, reason, "removing item");
            removed.push(id);
        }
    }
    Ok(removed)
}
