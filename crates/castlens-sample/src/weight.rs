//! Per-item sampling weight.
//!
//! ```text
//! weight = 1
//!        + ln(1 + likes)   * 0.5
//!        + ln(1 + replies) * 0.3
//!        + 1.0 if it has an image
//!        + 0.5 if it has a link
//!        + 0.3 if it is a quote
//!        + min(5, enabled matching traits) * 0.4
//! ```

use castlens_core::index::TraitIndex;
use castlens_core::model::ContentItem;
use castlens_core::model::structure::{has_image, has_link, is_quote};
use castlens_core::traits::TraitsRegistry;

const BASE: f64 = 1.0;
const LIKES_FACTOR: f64 = 0.5;
const REPLIES_FACTOR: f64 = 0.3;
const IMAGE_BONUS: f64 = 1.0;
const LINK_BONUS: f64 = 0.5;
const QUOTE_BONUS: f64 = 0.3;
const TRAIT_BONUS: f64 = 0.4;
/// Traits beyond this count add nothing.
pub const TRAIT_CAP: usize = 5;

/// Weight of one item given how many enabled traits it carries.
#[must_use]
pub fn item_weight(item: &ContentItem, enabled_traits: usize) -> f64 {
    let mut weight = BASE;
    weight += (item.likes() as f64).ln_1p() * LIKES_FACTOR;
    weight += (item.reply_count() as f64).ln_1p() * REPLIES_FACTOR;
    if has_image(item) {
        weight += IMAGE_BONUS;
    }
    if has_link(item) {
        weight += LINK_BONUS;
    }
    if is_quote(item) {
        weight += QUOTE_BONUS;
    }
    weight + enabled_traits.min(TRAIT_CAP) as f64 * TRAIT_BONUS
}

/// Weights for every item, counting enabled index membership.
#[must_use]
pub fn weights(items: &[ContentItem], index: &TraitIndex, registry: &TraitsRegistry) -> Vec<f64> {
    items
        .iter()
        .map(|item| item_weight(item, index.enabled_count(&item.stable_key(), registry)))
        .collect()
}
