//! Property tests for ranking and pagination invariants.

use castlens_core::clock::DEFAULT_TIMEZONE;
use castlens_core::index::TraitIndex;
use castlens_core::model::{ContentItem, Embed, EmbeddedItem, Reactions};
use castlens_core::traits::TraitsRegistry;
use castlens_search::matcher::{QueryHit, query_hit};
use castlens_search::{SearchFilters, SortOrder, matches, search};
use proptest::prelude::*;

const WORDS: &[&str] = &["gm", "hello", "rust", "lol", "🔥", "frens"];

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..5).prop_map(|w| w.join(" "))
}

fn arb_item(seq: usize) -> impl Strategy<Value = ContentItem> {
    (
        arb_text(),
        prop::option::of(arb_text()),
        0u32..28,
        0u64..20,
    )
        .prop_map(move |(text, quoted, day, likes)| ContentItem {
            id: Some(format!("0x{seq:04}")),
            text: Some(text),
            timestamp: Some(format!("2024-02-{:02}T10:00:00Z", day + 1)),
            reactions: Some(Reactions {
                likes_count: Some(likes),
                recasts_count: None,
            }),
            embeds: quoted
                .map(|q| {
                    vec![Embed::QuotedItem {
                        quoted_item: Box::new(EmbeddedItem {
                            text: Some(q),
                            ..EmbeddedItem::default()
                        }),
                    }]
                })
                .unwrap_or_default(),
            ..ContentItem::default()
        })
}

fn arb_items() -> impl Strategy<Value = Vec<ContentItem>> {
    (0usize..20).prop_flat_map(|n| (0..n).map(arb_item).collect::<Vec<_>>())
}

fn arb_filters() -> impl Strategy<Value = SearchFilters> {
    (
        prop::option::of(prop::sample::select(WORDS)),
        -3i64..25,
        prop::option::of(-2i64..25),
        prop::sample::select(vec![SortOrder::Newest, SortOrder::Likes, SortOrder::Replies]),
        prop::option::of(0u64..20),
    )
        .prop_map(|(query, offset, limit, sort_by, min_likes)| SearchFilters {
            query: query.map(str::to_string),
            offset,
            limit,
            sort_by,
            min_likes,
            ..SearchFilters::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn total_counts_every_match_and_page_is_clamped(items in arb_items(), filters in arb_filters()) {
        let response = search(&items, &filters, &TraitIndex::new(), &TraitsRegistry::new(), DEFAULT_TIMEZONE);
        let expected = items.iter().filter(|i| matches(i, &filters, DEFAULT_TIMEZONE)).count();
        prop_assert_eq!(response.total, expected);

        let offset = usize::try_from(filters.offset.max(0)).unwrap_or(0).min(expected);
        let remaining = expected - offset;
        let want = filters
            .limit
            .map_or(remaining, |l| usize::try_from(l.max(0)).unwrap_or(0).min(remaining));
        prop_assert_eq!(response.results.len(), want);
    }

    #[test]
    fn direct_hits_never_follow_embedded_hits(items in arb_items(), filters in arb_filters()) {
        let filters = SearchFilters { offset: 0, limit: None, ..filters };
        let response = search(&items, &filters, &TraitIndex::new(), &TraitsRegistry::new(), DEFAULT_TIMEZONE);
        if let Some(query) = filters.normalized_query() {
            let hits: Vec<_> = response
                .results
                .iter()
                .map(|item| query_hit(item, &query))
                .collect();
            prop_assert!(hits.iter().all(Option::is_some));
            let first_embedded = hits.iter().position(|h| *h == Some(QueryHit::Embedded));
            if let Some(pos) = first_embedded {
                prop_assert!(hits[pos..].iter().all(|h| *h == Some(QueryHit::Embedded)));
            }
        }
    }

    #[test]
    fn suggestions_only_for_empty_query_results(items in arb_items(), filters in arb_filters()) {
        let response = search(&items, &filters, &TraitIndex::new(), &TraitsRegistry::new(), DEFAULT_TIMEZONE);
        if !response.suggestions.is_empty() {
            prop_assert_eq!(response.total, 0);
            prop_assert!(filters.trimmed_query().is_some());
            prop_assert!(response.suggestions.len() <= 5);
            prop_assert!(response.suggestions.iter().all(|s| s.score > 0.0));
        }
    }
}
