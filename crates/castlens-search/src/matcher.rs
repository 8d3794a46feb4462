//! Filter evaluation for a single item.
//!
//! [`Matcher`] resolves a [`SearchFilters`] once (query folding, date
//! bounds, enabled trait names) and then tests items with AND semantics.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use castlens_core::clock::{civil_time_of, parse_timestamp};
use castlens_core::index::TraitIndex;
use castlens_core::model::ContentItem;
use castlens_core::model::structure::{has_image, has_link, is_quote, own_emojis};
use castlens_core::traits::TraitsRegistry;

use crate::filters::{LONGFORM_MIN_CHARS, SearchFilters};

/// A resolved date bound. An unparsable bound matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Unset,
    At(DateTime<Utc>),
    Invalid,
}

impl Bound {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Unset,
            Some(raw) => parse_timestamp(raw).map_or(Self::Invalid, Self::At),
        }
    }

    const fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

/// Where a query hit landed in an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryHit {
    /// The item's own text contains the query.
    Direct,
    /// Only a directly quoted item's text contains the query.
    Embedded,
}

/// Classify where `query_lower` occurs in `item`, if anywhere.
#[must_use]
pub fn query_hit(item: &ContentItem, query_lower: &str) -> Option<QueryHit> {
    if item.text_or_empty().to_lowercase().contains(query_lower) {
        return Some(QueryHit::Direct);
    }
    item.quoted_items()
        .any(|quoted| {
            quoted
                .text
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(query_lower)
        })
        .then_some(QueryHit::Embedded)
}

#[derive(Debug, Clone)]
pub struct Matcher<'a> {
    filters: &'a SearchFilters,
    query: Option<String>,
    date_from: Bound,
    date_to: Bound,
    tz: Tz,
    required_traits: Vec<&'a str>,
    index: Option<&'a TraitIndex>,
}

impl<'a> Matcher<'a> {
    /// Resolve `filters` without trait membership.
    #[must_use]
    pub fn new(filters: &'a SearchFilters, tz: Tz) -> Self {
        Self {
            filters,
            query: filters.normalized_query(),
            date_from: Bound::parse(filters.date_from.as_deref()),
            date_to: Bound::parse(filters.date_to.as_deref()),
            tz,
            required_traits: Vec::new(),
            index: None,
        }
    }

    /// Also require every enabled trait listed in `filters.traits`.
    ///
    /// Disabled and unknown names are dropped. With none left the trait
    /// filter is inactive.
    #[must_use]
    pub fn with_traits(mut self, index: &'a TraitIndex, registry: &TraitsRegistry) -> Self {
        self.required_traits = self
            .filters
            .traits
            .iter()
            .map(String::as_str)
            .filter(|name| registry.is_enabled(name))
            .collect();
        self.index = Some(index);
        self
    }

    /// Lower-cased query, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// `true` if `item` passes every specified filter.
    #[must_use]
    pub fn matches(&self, item: &ContentItem) -> bool {
        let f = self.filters;

        if let Some(query) = self.query.as_deref()
            && query_hit(item, query).is_none()
        {
            return false;
        }

        if f.is_quote.is_some_and(|want| is_quote(item) != want)
            || f.has_image.is_some_and(|want| has_image(item) != want)
            || f.has_link.is_some_and(|want| has_link(item) != want)
        {
            return false;
        }

        if !self.in_date_range(item) {
            return false;
        }

        if !f.emojis.is_empty() {
            let own = own_emojis(item);
            if !own.iter().any(|e| f.emojis.iter().any(|want| want == e)) {
                return false;
            }
        }

        let text = item.text_or_empty();
        if f.one_word && text.split_whitespace().count() != 1 {
            return false;
        }
        if f.longform && text.chars().count() < LONGFORM_MIN_CHARS {
            return false;
        }

        if f.min_likes.is_some_and(|min| item.likes() < min)
            || f.min_replies.is_some_and(|min| item.reply_count() < min)
        {
            return false;
        }

        self.in_time_window(item) && self.has_required_traits(item)
    }

    fn in_date_range(&self, item: &ContentItem) -> bool {
        if !self.date_from.is_set() && !self.date_to.is_set() {
            return true;
        }
        let Some(ts) = item.timestamp.as_deref().and_then(parse_timestamp) else {
            return false;
        };
        let after_start = match self.date_from {
            Bound::Unset => true,
            Bound::At(from) => ts >= from,
            Bound::Invalid => false,
        };
        let before_end = match self.date_to {
            Bound::Unset => true,
            Bound::At(to) => ts <= to,
            Bound::Invalid => false,
        };
        after_start && before_end
    }

    fn in_time_window(&self, item: &ContentItem) -> bool {
        let f = self.filters;
        if f.time_bucket.is_none() && f.time_pattern.is_none() {
            return true;
        }
        let Some(civil) = item
            .timestamp
            .as_deref()
            .and_then(|raw| civil_time_of(raw, self.tz))
        else {
            return false;
        };
        f.time_bucket.is_none_or(|bucket| bucket.contains_hour(civil.hour))
            && f.time_pattern
                .is_none_or(|pattern| pattern.matches(civil.hour, civil.minute))
    }

    fn has_required_traits(&self, item: &ContentItem) -> bool {
        let Some(index) = self.index else {
            return true;
        };
        if self.required_traits.is_empty() {
            return true;
        }
        let Some(names) = index.get(&item.stable_key()) else {
            return false;
        };
        self.required_traits.iter().all(|name| names.contains(*name))
    }
}

/// Test one item against `filters` (trait membership not considered).
#[must_use]
pub fn matches(item: &ContentItem, filters: &SearchFilters, tz: Tz) -> bool {
    Matcher::new(filters, tz).matches(item)
}
