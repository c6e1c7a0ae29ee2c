//! Memoized renderings with a capacity bound.
//!
//! Rendering an item (rasterizing a glyph set, say) is far more expensive
//! than comparing two renderings, and each item takes part in N−1
//! comparisons. [`RenderCache`] keeps renderings around between
//! comparisons but caps how many it holds at once.
//!
//! The bound is expressed the way image memory is sized:
//!
//! ```text
//! charset_len × entries × unit_image_size > limit   ⇒   evict one entry
//! ```
//!
//! The check runs on a miss, before the new rendering is inserted, and
//! evicts at most one entry per insertion. This is a capacity bound, not a
//! recency policy: with [`EvictionPolicy::Arbitrary`] the victim is whatever
//! the map yields first. [`EvictionPolicy::LeastRecentlyUsed`] exists so
//! callers (and tests) can pin the victim.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builder::Renderer;
use crate::error::Result;

/// Memory budget for a [`RenderCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBudget {
    /// Upper bound on `charset_len * entries * unit_image_size`.
    pub limit: usize,
    /// Number of glyphs rendered per item.
    pub charset_len: usize,
    /// Edge length of one rendered glyph.
    pub unit_image_size: usize,
}

impl Default for CacheBudget {
    fn default() -> Self {
        Self {
            limit: 1_200_000,
            charset_len: 20,
            unit_image_size: 200,
        }
    }
}

impl CacheBudget {
    /// Create a budget.
    pub fn new(limit: usize, charset_len: usize, unit_image_size: usize) -> Self {
        Self {
            limit,
            charset_len,
            unit_image_size,
        }
    }

    /// A budget that evicts as soon as the cache holds more than `entries`.
    pub fn entries(entries: usize) -> Self {
        Self::new(entries, 1, 1)
    }

    /// True when a cache holding `entries` renderings is over budget.
    pub fn exceeded_by(&self, entries: usize) -> bool {
        self.charset_len
            .saturating_mul(entries)
            .saturating_mul(self.unit_image_size)
            > self.limit
    }
}

/// Which entry to drop when the budget is exceeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// First entry in map iteration order. Unspecified, may vary per run.
    #[default]
    Arbitrary,
    /// Entry with the oldest access.
    LeastRecentlyUsed,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    last_used: u64,
}

/// Capacity-bounded memo table over a [`Renderer`].
///
/// Scoped to one matrix build; there is no invalidation.
pub struct RenderCache<'r, R: Renderer + ?Sized> {
    renderer: &'r R,
    entries: HashMap<String, Entry<R::Output>>,
    budget: CacheBudget,
    policy: EvictionPolicy,
    tick: u64,
    renders: usize,
}

impl<'r, R: Renderer + ?Sized> RenderCache<'r, R> {
    /// Create an empty cache in front of `renderer`.
    pub fn new(renderer: &'r R, budget: CacheBudget, policy: EvictionPolicy) -> Self {
        Self {
            renderer,
            entries: HashMap::new(),
            budget,
            policy,
            tick: 0,
            renders: 0,
        }
    }

    /// Rendering for `id`, rendering and storing it on a miss.
    pub fn get(&mut self, id: &str) -> Result<&R::Output> {
        self.tick += 1;
        let tick = self.tick;
        if let Some(entry) = self.entries.get_mut(id) {
            entry.last_used = tick;
        } else {
            let value = self.render(id)?;
            if self.budget.exceeded_by(self.entries.len()) {
                self.evict();
            }
            self.entries.insert(
                id.to_owned(),
                Entry {
                    value,
                    last_used: tick,
                },
            );
        }
        Ok(&self.entries[id].value)
    }

    /// Remove and return the rendering for `id`, rendering it if absent.
    ///
    /// Used once an item will not be compared again.
    pub fn take(&mut self, id: &str) -> Result<R::Output> {
        match self.entries.remove(id) {
            Some(entry) => Ok(entry.value),
            None => self.render(id),
        }
    }

    /// Number of cached renderings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if `id` is cached.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Total renderer invocations so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    fn render(&mut self, id: &str) -> Result<R::Output> {
        self.renders += 1;
        self.renderer.render(id)
    }

    fn evict(&mut self) {
        let victim = match self.policy {
            EvictionPolicy::Arbitrary => self.entries.keys().next().cloned(),
            EvictionPolicy::LeastRecentlyUsed => self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone()),
        };
        if let Some(key) = victim {
            debug!(item = %key, entries = self.entries.len(), "evicting rendering");
            self.entries.remove(&key);
        }
    }
}
