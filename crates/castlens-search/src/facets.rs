//! Facet counts over a filtered result set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use castlens_core::model::ContentItem;
use castlens_core::model::structure::{has_image, has_link, is_quote, own_emojis};

/// How many emoji the facet list keeps.
pub const TOP_EMOJI_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiCount {
    pub emoji: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCounts {
    pub quotes: usize,
    pub images: usize,
    pub links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    /// Most frequent emoji in own text, ties in first-seen order.
    pub top_emojis: Vec<EmojiCount>,
    pub counts: FacetCounts,
}

/// Compute facets over every item in `items`.
#[must_use]
pub fn compute(items: &[&ContentItem]) -> Facets {
    let mut counts = FacetCounts::default();
    let mut emoji_order: Vec<(&str, usize)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();

    for item in items {
        if is_quote(item) {
            counts.quotes += 1;
        }
        if has_image(item) {
            counts.images += 1;
        }
        if has_link(item) {
            counts.links += 1;
        }
        for emoji in own_emojis(item) {
            if let Some(&i) = slot.get(emoji) {
                emoji_order[i].1 += 1;
            } else {
                slot.insert(emoji, emoji_order.len());
                emoji_order.push((emoji, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    emoji_order.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    let top_emojis = emoji_order
        .into_iter()
        .take(TOP_EMOJI_LIMIT)
        .map(|(emoji, count)| EmojiCount {
            emoji: emoji.to_string(),
            count,
        })
        .collect();

    Facets { top_emojis, counts }
}
