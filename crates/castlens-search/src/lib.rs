#![forbid(unsafe_code)]
//! castlens-search library.
//!
//! Filtering, ranking, pagination, facets, and fallback suggestions over an
//! in-memory item corpus.
//!
//! # Conventions
//!
//! - **Errors**: parsing of user-facing enums returns `anyhow::Result`;
//!   malformed filter input is clamped or matches nothing rather than
//!   failing the search.
//! - **Logging**: `tracing` macros (`debug!`).

pub mod facets;
pub mod filters;
pub mod matcher;
pub mod ranking;
pub mod suggest;

use std::time::Instant;

use chrono_tz::Tz;
use serde::Serialize;

use castlens_core::index::TraitIndex;
use castlens_core::model::ContentItem;
use castlens_core::traits::TraitsRegistry;

pub use facets::Facets;
pub use filters::{SearchFilters, SortOrder, TimeBucket, TimePattern};
pub use matcher::{Matcher, matches};
pub use suggest::Suggestion;

/// One page of results plus facets over the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse<'a> {
    pub results: Vec<&'a ContentItem>,
    /// Filtered count before pagination.
    pub total: usize,
    pub facets: Facets,
    /// Present only when a non-empty query found nothing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion<'a>>,
}

/// Run one search over `items`.
///
/// Filters (including enabled trait membership from `index`) are applied
/// first, then ranking, facets over the full filtered set, and pagination.
/// When a non-empty query yields nothing, the other filters are re-run
/// without it and the survivors are scored for suggestions.
#[must_use]
pub fn search<'a>(
    items: &'a [ContentItem],
    filters: &SearchFilters,
    index: &TraitIndex,
    registry: &TraitsRegistry,
    tz: Tz,
) -> SearchResponse<'a> {
    let start = Instant::now();
    let matcher = Matcher::new(filters, tz).with_traits(index, registry);
    let filtered: Vec<&ContentItem> = items.iter().filter(|item| matcher.matches(item)).collect();
    let ranked = ranking::rank(filtered, matcher.query(), filters.sort_by);

    let total = ranked.len();
    let facets = facets::compute(&ranked);
    let (offset, limit) = filters.page_bounds(total);
    let results = ranking::paginate(&ranked, offset, limit);

    let suggestions = match filters.trimmed_query() {
        Some(query) if total == 0 => {
            let relaxed = filters.without_query();
            let fallback = Matcher::new(&relaxed, tz).with_traits(index, registry);
            let candidates: Vec<&ContentItem> =
                items.iter().filter(|item| fallback.matches(item)).collect();
            suggest::suggest(&candidates, query)
        }
        _ => Vec::new(),
    };

    tracing::debug!(
        total,
        returned = results.len(),
        suggestions = suggestions.len(),
        elapsed_us = start.elapsed().as_micros(),
        "search complete"
    );

    SearchResponse {
        results,
        total,
        facets,
        suggestions,
    }
}
