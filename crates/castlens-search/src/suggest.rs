//! Fuzzy "did you mean" suggestions for queries with no results.
//!
//! Scores blend word-set and character-trigram Jaccard similarity between
//! the query and an item's own text plus any directly quoted text:
//!
//! ```text
//! score = 0.6 * jaccard(words) + 0.4 * jaccard(trigrams)
//! ```

use std::collections::HashSet;
use std::hash::Hash;

use serde::Serialize;

use castlens_core::model::ContentItem;
use castlens_core::model::structure::combined_text;

/// How many suggestions are returned at most.
pub const MAX_SUGGESTIONS: usize = 5;

const WORD_WEIGHT: f64 = 0.6;
const TRIGRAM_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion<'a> {
    pub item: &'a ContentItem,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// `|A ∩ B| / |A ∪ B|`, or `0.0` when both sets are empty.
#[must_use]
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union_size = a.len() + b.len() - intersection;
    if union_size == 0 {
        0.0
    } else {
        intersection as f64 / union_size as f64
    }
}

/// Lower-cased alphanumeric tokens longer than one character.
#[must_use]
pub fn word_set(input: &str) -> HashSet<String> {
    let cleaned: String = input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Overlapping three-character windows of the lower-cased,
/// whitespace-collapsed input. Shorter inputs yield themselves.
#[must_use]
pub fn trigram_set(input: &str) -> HashSet<String> {
    let collapsed = input.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() < 3 {
        return if collapsed.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([collapsed])
        };
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Blend of word and trigram similarity, `0.0` if either side is empty.
#[must_use]
pub fn similarity(query: &str, text: &str) -> f64 {
    if query.is_empty() || text.is_empty() {
        return 0.0;
    }
    let words = jaccard(&word_set(query), &word_set(text));
    let trigrams = jaccard(&trigram_set(query), &trigram_set(text));
    WORD_WEIGHT.mul_add(words, TRIGRAM_WEIGHT * trigrams)
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

/// Score `candidates` against `query`, keep positive scores, return the
/// best [`MAX_SUGGESTIONS`] in descending order (ties keep input order).
#[must_use]
pub fn suggest<'a>(candidates: &[&'a ContentItem], query: &str) -> Vec<Suggestion<'a>> {
    let mut scored: Vec<Suggestion<'a>> = candidates
        .iter()
        .copied()
        .map(|item| Suggestion {
            item,
            score: similarity(query, &combined_text(item)),
        })
        .filter(|s| s.score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(MAX_SUGGESTIONS);
    scored
}
