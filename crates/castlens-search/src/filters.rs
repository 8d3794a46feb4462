//! Search request types: filters, sort order, time buckets and patterns.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text length at or above which an item counts as longform.
pub const LONGFORM_MIN_CHARS: usize = 240;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sort key for results. Every order is descending and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recent timestamp first; unparsable timestamps sort as the epoch.
    #[default]
    Newest,
    /// Most likes first.
    Likes,
    /// Most replies first.
    Replies,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newest => f.write_str("newest"),
            Self::Likes => f.write_str("likes"),
            Self::Replies => f.write_str("replies"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" | "recent" | "time" => Ok(Self::Newest),
            "likes" | "liked" => Ok(Self::Likes),
            "replies" | "replied" => Ok(Self::Replies),
            other => bail!("unknown sort order '{other}': expected one of newest, likes, replies"),
        }
    }
}

// ---------------------------------------------------------------------------
// Time-of-day collections
// ---------------------------------------------------------------------------

/// Hour-of-day bucket in the configured civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeBucket {
    /// Hour 0.
    Midnight,
    /// Hours 6 through 10.
    Morning,
    /// Hour 12.
    Lunch,
}

impl TimeBucket {
    #[must_use]
    pub const fn contains_hour(self, hour: u32) -> bool {
        match self {
            Self::Midnight => hour == 0,
            Self::Morning => matches!(hour, 6..=10),
            Self::Lunch => hour == 12,
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Midnight => f.write_str("midnight"),
            Self::Morning => f.write_str("morning"),
            Self::Lunch => f.write_str("lunch"),
        }
    }
}

impl FromStr for TimeBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midnight" => Ok(Self::Midnight),
            "morning" => Ok(Self::Morning),
            "lunch" => Ok(Self::Lunch),
            other => bail!("unknown time bucket '{other}': expected one of midnight, morning, lunch"),
        }
    }
}

/// Minute pattern in the configured civil timezone, on the 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimePattern {
    /// Minute 0.
    TopOfHour,
    /// Minute 59.
    BuzzerBeater,
    /// 11:11.
    ElevenEleven,
    /// 1:11, 2:22, 3:33, 4:44, 5:55.
    Duplicities,
}

impl TimePattern {
    #[must_use]
    pub const fn matches(self, hour: u32, minute: u32) -> bool {
        match self {
            Self::TopOfHour => minute == 0,
            Self::BuzzerBeater => minute == 59,
            Self::ElevenEleven => hour == 11 && minute == 11,
            Self::Duplicities => matches!(hour, 1..=5) && minute == hour * 11,
        }
    }
}

impl fmt::Display for TimePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopOfHour => f.write_str("topOfHour"),
            Self::BuzzerBeater => f.write_str("buzzerBeater"),
            Self::ElevenEleven => f.write_str("elevenEleven"),
            Self::Duplicities => f.write_str("duplicities"),
        }
    }
}

impl FromStr for TimePattern {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "topofhour" => Ok(Self::TopOfHour),
            "buzzerbeater" => Ok(Self::BuzzerBeater),
            "eleveneleven" | "1111" => Ok(Self::ElevenEleven),
            "duplicities" => Ok(Self::Duplicities),
            _ => bail!(
                "unknown time pattern '{}': expected one of topOfHour, buzzerBeater, elevenEleven, duplicities",
                s.trim()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filter, sort, and pagination criteria for one search.
///
/// All fields are optional. When multiple fields are set, they are combined
/// with AND semantics. Boolean flags that are `false` (or absent) for
/// `one_word`/`longform` do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Case-insensitive substring, trimmed before use.
    #[serde(rename = "q", skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Negative offsets clamp to zero.
    pub offset: i64,
    /// Absent means every remaining result. Negative limits clamp to zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_quote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_image: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_link: Option<bool>,
    /// Inclusive lower bound, ISO-8601.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    /// Inclusive upper bound, ISO-8601.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    /// Match any of these pictographs in the item's own text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emojis: Vec<String>,
    pub one_word: bool,
    pub longform: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_replies: Option<u64>,
    pub sort_by: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_bucket: Option<TimeBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_pattern: Option<TimePattern>,
    /// Require every listed enabled trait. Disabled or unknown names are
    /// ignored.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
}

impl SearchFilters {
    /// Lower-cased, trimmed query, or `None` when empty.
    #[must_use]
    pub fn normalized_query(&self) -> Option<String> {
        let q = self.query.as_deref()?.trim();
        if q.is_empty() {
            None
        } else {
            Some(q.to_lowercase())
        }
    }

    /// Trimmed query text as typed, or `None` when empty.
    #[must_use]
    pub fn trimmed_query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Same filters with the query removed.
    #[must_use]
    pub fn without_query(&self) -> Self {
        Self {
            query: None,
            ..self.clone()
        }
    }

    /// `(offset, limit)` clamped to `total` results.
    #[must_use]
    pub fn page_bounds(&self, total: usize) -> (usize, usize) {
        let offset = usize::try_from(self.offset.max(0)).unwrap_or(usize::MAX).min(total);
        let remaining = total - offset;
        let limit = self.limit.map_or(remaining, |limit| {
            usize::try_from(limit.max(0)).unwrap_or(usize::MAX).min(remaining)
        });
        (offset, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parses_aliases() {
        assert_eq!("newest".parse::<SortOrder>().expect("parse"), SortOrder::Newest);
        assert_eq!(" Likes ".parse::<SortOrder>().expect("parse"), SortOrder::Likes);
        assert_eq!("replied".parse::<SortOrder>().expect("parse"), SortOrder::Replies);
        assert!("oldest".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default().to_string(), "newest");
    }

    #[test]
    fn time_patterns_parse_and_display() {
        for pattern in [
            TimePattern::TopOfHour,
            TimePattern::BuzzerBeater,
            TimePattern::ElevenEleven,
            TimePattern::Duplicities,
        ] {
            assert_eq!(pattern.to_string().parse::<TimePattern>().expect("parse"), pattern);
        }
        assert_eq!("top-of-hour".parse::<TimePattern>().expect("parse"), TimePattern::TopOfHour);
        assert!("noon".parse::<TimePattern>().is_err());
    }

    #[test]
    fn bucket_and_pattern_rules() {
        assert!(TimeBucket::Midnight.contains_hour(0));
        assert!(TimeBucket::Morning.contains_hour(6));
        assert!(TimeBucket::Morning.contains_hour(10));
        assert!(!TimeBucket::Morning.contains_hour(11));
        assert!(TimeBucket::Lunch.contains_hour(12));

        assert!(TimePattern::ElevenEleven.matches(11, 11));
        assert!(!TimePattern::ElevenEleven.matches(23, 11));
        assert!(TimePattern::Duplicities.matches(3, 33));
        assert!(TimePattern::Duplicities.matches(5, 55));
        assert!(!TimePattern::Duplicities.matches(0, 0));
        assert!(!TimePattern::Duplicities.matches(6, 6));
        assert!(TimePattern::BuzzerBeater.matches(7, 59));
    }

    #[test]
    fn filters_deserialize_from_camel_case() {
        let raw = r#"{
            "q": "  Hello ",
            "isQuote": true,
            "minLikes": 3,
            "sortBy": "likes",
            "timePattern": "elevenEleven",
            "emojis": ["🔥"],
            "traits": ["gm"]
        }"#;
        let filters: SearchFilters = serde_json::from_str(raw).expect("parse");
        assert_eq!(filters.normalized_query().as_deref(), Some("hello"));
        assert_eq!(filters.trimmed_query(), Some("Hello"));
        assert_eq!(filters.is_quote, Some(true));
        assert_eq!(filters.min_likes, Some(3));
        assert_eq!(filters.sort_by, SortOrder::Likes);
        assert_eq!(filters.time_pattern, Some(TimePattern::ElevenEleven));
        assert_eq!(filters.offset, 0);
        assert!(filters.limit.is_none());
    }

    #[test]
    fn blank_query_is_no_query() {
        let filters = SearchFilters {
            query: Some("   ".into()),
            ..SearchFilters::default()
        };
        assert_eq!(filters.normalized_query(), None);
        assert_eq!(filters.trimmed_query(), None);
    }

    #[test]
    fn page_bounds_clamp() {
        let mut filters = SearchFilters::default();
        assert_eq!(filters.page_bounds(10), (0, 10));

        filters.offset = -4;
        filters.limit = Some(3);
        assert_eq!(filters.page_bounds(10), (0, 3));

        filters.offset = 8;
        assert_eq!(filters.page_bounds(10), (8, 2));

        filters.offset = 20;
        assert_eq!(filters.page_bounds(10), (10, 0));

        filters.offset = 0;
        filters.limit = Some(-1);
        assert_eq!(filters.page_bounds(10), (0, 0));
    }
}
