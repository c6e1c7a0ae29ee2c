//! All-pairs matrix construction over an external distance oracle.

use tracing::{info, trace};

use super::cache::{CacheBudget, EvictionPolicy, RenderCache};
use super::{check_distance, DistanceMatrix};
use crate::error::Result;

/// Produces the representation that a [`DistanceOracle`] compares.
///
/// Rendering may be arbitrarily expensive. Failures abort the build.
pub trait Renderer {
    /// Rendered representation of one item.
    type Output;

    /// Render the item named `id`.
    fn render(&self, id: &str) -> Result<Self::Output>;

    /// True if a rendering carries no usable content.
    fn is_null(&self, _rendered: &Self::Output) -> bool {
        false
    }
}

impl<F, T> Renderer for F
where
    F: Fn(&str) -> Result<T>,
{
    type Output = T;

    fn render(&self, id: &str) -> Result<T> {
        self(id)
    }
}

/// Nonnegative, symmetric dissimilarity between two renderings.
///
/// Zero between distinct items is accepted as a value.
pub trait DistanceOracle<T: ?Sized> {
    /// Distance between `a` and `b`.
    fn distance(&self, a: &T, b: &T) -> Result<f64>;
}

impl<F, T: ?Sized> DistanceOracle<T> for F
where
    F: Fn(&T, &T) -> Result<f64>,
{
    fn distance(&self, a: &T, b: &T) -> Result<f64> {
        self(a, b)
    }
}

/// Build progress, reported after every oracle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Pairs compared so far.
    pub done: usize,
    /// Total pairs, `N(N-1)/2`.
    pub total: usize,
    /// Rows not yet finished, counting the current one.
    pub remaining_rows: usize,
}

impl Progress {
    /// `done / total`; 1.0 when there is nothing to do.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

/// Drives a [`DistanceOracle`] over every unordered pair of items.
///
/// Renderings go through a [`RenderCache`] that lives for one call to
/// [`MatrixBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    budget: CacheBudget,
    eviction: EvictionPolicy,
}

impl MatrixBuilder {
    /// Builder with the default budget and arbitrary eviction.
    pub fn new() -> Self {
        Self::default()
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

    /// Build the full symmetric matrix for `items`.
    pub fn build<R, O>(&self, items: &[String], renderer: &R, oracle: &O) -> Result<DistanceMatrix>
    where
        R: Renderer + ?Sized,
        O: DistanceOracle<R::Output> + ?Sized,
    {
        self.build_with_progress(items, renderer, oracle, |_| {})
    }

    /// Build the matrix, calling `on_progress` after every oracle call.
    ///
    /// Exactly `N(N-1)/2` oracle calls are made, in row-major order over the
    /// upper triangle. Item `i`'s rendering leaves the cache as soon as its
    /// row starts, since no later row compares against it.
    pub fn build_with_progress<R, O, P>(
        &self,
        items: &[String],
        renderer: &R,
        oracle: &O,
        mut on_progress: P,
    ) -> Result<DistanceMatrix>
    where
        R: Renderer + ?Sized,
        O: DistanceOracle<R::Output> + ?Sized,
        P: FnMut(Progress),
    {
        let n = items.len();
        let total = n * n.saturating_sub(1) / 2;
        let mut matrix = DistanceMatrix::zeros(n);
        let mut cache = RenderCache::new(renderer, self.budget, self.eviction);
        let mut done = 0;

        info!(items = n, pairs = total, "building distance matrix");

        for i in 0..n {
            let a = cache.take(&items[i])?;
            for j in i + 1..n {
                let b = cache.get(&items[j])?;
                let d = oracle.distance(&a, b)?;
                check_distance(i, j, d)?;
                matrix.set(i, j, d);

                done += 1;
                let progress = Progress {
                    done,
                    total,
                    remaining_rows: n - i,
                };
                trace!(
                    fraction = progress.fraction(),
                    distance = d,
                    a = %items[i],
                    b = %items[j],
                    "pair"
                );
                on_progress(progress);
            }
        }

        info!(items = n, renders = cache.renders(), "distance matrix complete");
        Ok(matrix)
    }

    /// Render all items once and compare every pair on the rayon pool.
    ///
    /// Holds all N renderings at once, so the cache budget does not apply.
    /// The matrix is identical to [`MatrixBuilder::build`]'s.
    #[cfg(feature = "parallel")]
    pub fn build_parallel<R, O>(
        &self,
        items: &[String],
        renderer: &R,
        oracle: &O,
    ) -> Result<DistanceMatrix>
    where
        R: Renderer + Sync + ?Sized,
        R::Output: Send + Sync,
        O: DistanceOracle<R::Output> + Sync + ?Sized,
    {
        use rayon::prelude::*;

        let n = items.len();
        info!(items = n, "building distance matrix in parallel");

        let rendered = items
            .par_iter()
            .map(|id| renderer.render(id))
            .collect::<Result<Vec<_>>>()?;

        let rows = (0..n)
            .into_par_iter()
            .map(|i| {
                (i + 1..n)
                    .map(|j| {
                        let d = oracle.distance(&rendered[i], &rendered[j])?;
                        check_distance(i, j, d)?;
                        Ok(d)
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let mut matrix = DistanceMatrix::zeros(n);
        for (i, row) in rows.into_iter().enumerate() {
            for (k, d) in row.into_iter().enumerate() {
                matrix.set(i, i + 1 + k, d);
            }
        }
        info!(items = n, "distance matrix complete");
        Ok(matrix)
    }

    /// Drop items whose rendering is null according to
    /// [`Renderer::is_null`], preserving order.
    pub fn retain_renderable<R>(&self, items: Vec<String>, renderer: &R) -> Result<Vec<String>>
    where
        R: Renderer + ?Sized,
    {
        let before = items.len();
        let mut kept = Vec::with_capacity(before);
        for id in items {
            let rendered = renderer.render(&id)?;
            if renderer.is_null(&rendered) {
                info!(item = %id, "removing null item");
            } else {
                kept.push(id);
            }
        }
        info!(kept = kept.len(), of = before, "null filter done");
        Ok(kept)
    }
}
