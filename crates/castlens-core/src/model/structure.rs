//! Structural facets derived from an item: quote status, images, links, and
//! pictographic emoji.
//!
//! Search filters, facet counts, and sampling weights all read these, so the
//! definitions live next to the model rather than in any one consumer.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::item::{ContentItem, Embed};

const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".gif", ".webp"];
const IMAGE_HOSTS: [&str; 1] = ["imagedelivery.net"];

static PICTOGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Extended_Pictographic}").expect("pictograph pattern is valid")
});

/// `true` if the item quotes another item, inline or by hash.
#[must_use]
pub fn is_quote(item: &ContentItem) -> bool {
    item.embeds
        .iter()
        .any(|e| matches!(e, Embed::QuotedItem { .. } | Embed::QuotedItemRef { .. }))
}

/// `true` if the URL looks like an image by extension or known image CDN.
#[must_use]
pub fn is_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || IMAGE_HOSTS.iter().any(|host| lower.contains(host))
}

/// `true` if any top-level URL embed, or any URL embed of a directly quoted
/// item, is an image.
#[must_use]
pub fn has_image(item: &ContentItem) -> bool {
    let top = item.embeds.iter().filter_map(Embed::url);
    let nested = item
        .quoted_items()
        .flat_map(|quoted| quoted.embeds.iter().filter_map(Embed::url));
    top.chain(nested).any(is_image_url)
}

/// `true` if the item links anywhere: a URL in its own or a quoted item's
/// text, or a URL embed at the top level or inside a quoted item.
#[must_use]
pub fn has_link(item: &ContentItem) -> bool {
    if contains_url(item.text_or_empty()) {
        return true;
    }
    item.embeds.iter().any(|embed| match embed {
        Embed::Link { .. } => true,
        Embed::QuotedItem { quoted_item } => {
            contains_url(quoted_item.text.as_deref().unwrap_or(""))
                || quoted_item
                    .embeds
                    .iter()
                    .any(|e| matches!(e, Embed::Link { .. }))
        }
        Embed::QuotedItemRef { .. } => false,
    })
}

fn contains_url(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("http://") || lower.contains("https://")
}

/// Pictographic emoji in `text`, in order of appearance.
#[must_use]
pub fn extract_emojis(text: &str) -> Vec<&str> {
    PICTOGRAPH.find_iter(text).map(|m| m.as_str()).collect()
}

/// Pictographic emoji from the item's own text only (quoted text excluded).
#[must_use]
pub fn own_emojis(item: &ContentItem) -> Vec<&str> {
    extract_emojis(item.text_or_empty())
}

/// Own text followed by the text of every directly quoted item,
/// space-separated.
#[must_use]
pub fn combined_text(item: &ContentItem) -> String {
    let mut acc = item.text_or_empty().to_string();
    for quoted in item.quoted_items() {
        acc.push(' ');
        acc.push_str(quoted.text.as_deref().unwrap_or(""));
    }
    acc
}
