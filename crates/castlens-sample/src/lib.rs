#![forbid(unsafe_code)]
//! castlens-sample library.
//!
//! Draws a small, engagement- and trait-biased random subset of items
//! without replacement. The RNG is injected so draws are reproducible
//! under a seed.
//!
//! # Conventions
//!
//! - **Errors**: none; an empty pool yields an empty draw.
//! - **Logging**: `tracing` macros (`debug!`).

pub mod weight;

use rand::Rng;

use castlens_core::index::TraitIndex;
use castlens_core::model::ContentItem;
use castlens_core::traits::TraitsRegistry;

pub use weight::{item_weight, weights};

/// Items drawn per sample.
pub const SAMPLE_SIZE: usize = 3;

/// Draw up to `count` distinct positions from `weights`.
///
/// Each round picks a uniform point in `[0, total)` over the remaining
/// positive weights and walks the pool until the point is used up. When
/// the remaining total is not positive the pick is uniform instead.
/// Negative weights count as zero.
pub fn draw_without_replacement<R: Rng + ?Sized>(
    weights: &[f64],
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut pool: Vec<(usize, f64)> = weights
        .iter()
        .enumerate()
        .map(|(i, w)| (i, if w.is_finite() { w.max(0.0) } else { 0.0 }))
        .collect();
    let mut picked = Vec::with_capacity(count.min(pool.len()));

    while picked.len() < count && !pool.is_empty() {
        let total: f64 = pool.iter().map(|(_, w)| w).sum();
        let slot = if total > 0.0 {
            weighted_slot(&pool, rng.gen_range(0.0..total))
        } else {
            rng.gen_range(0..pool.len())
        };
        picked.push(pool.remove(slot).0);
    }
    picked
}

fn weighted_slot(pool: &[(usize, f64)], mut point: f64) -> usize {
    let mut last_positive = 0;
    for (slot, (_, weight)) in pool.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        last_positive = slot;
        point -= weight;
        if point <= 0.0 {
            return slot;
        }
    }
    // Rounding can leave a sliver of `point` after the last weight.
    last_positive
}

/// Draw [`SAMPLE_SIZE`] distinct items, biased by [`item_weight`].
pub fn sample<'a, R: Rng + ?Sized>(
    items: &'a [ContentItem],
    index: &TraitIndex,
    registry: &TraitsRegistry,
    rng: &mut R,
) -> Vec<&'a ContentItem> {
    let weights = weights(items, index, registry);
    let picked = draw_without_replacement(&weights, SAMPLE_SIZE, rng);
    tracing::debug!(pool = items.len(), picked = picked.len(), "sampled items");
    picked.into_iter().map(|i| &items[i]).collect()
}
