//! Result ordering and pagination.

use castlens_core::clock::epoch_millis_or_zero;
use castlens_core::model::ContentItem;

use crate::filters::SortOrder;
use crate::matcher::{QueryHit, query_hit};

fn sort_key(item: &ContentItem, order: SortOrder) -> i64 {
    match order {
        SortOrder::Newest => epoch_millis_or_zero(item.timestamp.as_deref()),
        SortOrder::Likes => i64::try_from(item.likes()).unwrap_or(i64::MAX),
        SortOrder::Replies => i64::try_from(item.reply_count()).unwrap_or(i64::MAX),
    }
}

/// Stable descending sort by `order`.
pub fn sort_items(items: &mut [&ContentItem], order: SortOrder) {
    items.sort_by_key(|item| std::cmp::Reverse(sort_key(item, order)));
}

/// Order filtered items for display.
///
/// With a query, items whose own text matches come first and items that
/// match only through a quoted item follow; each group is sorted on its
/// own. Without a query the whole set is sorted once.
#[must_use]
pub fn rank<'a>(
    mut items: Vec<&'a ContentItem>,
    query_lower: Option<&str>,
    order: SortOrder,
) -> Vec<&'a ContentItem> {
    let Some(query) = query_lower else {
        sort_items(&mut items, order);
        return items;
    };

    let (mut direct, mut embedded): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| query_hit(item, query) != Some(QueryHit::Embedded));
    sort_items(&mut direct, order);
    sort_items(&mut embedded, order);
    direct.extend(embedded);
    direct
}

/// Slice `[offset, offset + limit)` clamped to `items`.
#[must_use]
pub fn paginate<T: Copy>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    let start = offset.min(items.len());
    let end = start.saturating_add(limit).min(items.len());
    items[start..end].to_vec()
}
