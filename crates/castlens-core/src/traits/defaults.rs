//! Starter trait pack seeded on first run.

use chrono::{DateTime, Utc};

use crate::traits::{TraitDefinition, TraitsRegistry};

/// `(name, description, code)` for each default trait.
const PACK: &[(&str, &str, &str)] = &[
    (
        "Welcome",
        "Welcomes a new user and mentions them",
        r"(cast) => /\bwelcome\b/i.test(cast.text ?? '') && /@\w+/.test(cast.text ?? '')",
    ),
    (
        "Humorous",
        "Has a lol, haha, or lmao",
        r"(cast) => /\b(lol|haha|lmao)\b/i.test(cast.text ?? '')",
    ),
    (
        "Emoji",
        "Contains an emoji",
        "(cast) => emojis(cast.text).length > 0",
    ),
    (
        "Wtf",
        "Contains \"wtf\"",
        r"(cast) => /\bwtf\b/i.test(cast.text ?? '')",
    ),
    (
        "Mentioner",
        "Mentions a user",
        r"(cast) => /@\w+/.test(cast.text ?? '')",
    ),
    (
        "TIL",
        "Shares something learned (TIL)",
        "(cast) => (cast.text ?? '').includes('TIL')",
    ),
    (
        "One Word",
        "A single word",
        "(cast) => len(words(cast.text)) == 1",
    ),
    (
        "Longform",
        "100 words or more",
        "(cast) => len(words(cast.text)) >= 100",
    ),
    (
        "11:11 club",
        "Posted at 11:11 local time",
        "(cast) => hour(cast.timestamp) == 11 && minute(cast.timestamp) == 11",
    ),
    (
        "1:11, 2:22, 3:33, 4:44, 5:55",
        "Hour and minute repeat the same digit, 1:11 through 5:55 local time",
        "(cast) => hour(cast.timestamp) >= 1 && hour(cast.timestamp) <= 5 \
         && minute(cast.timestamp) == hour(cast.timestamp) * 11",
    ),
    (
        "Breakfast club",
        "Posted between 7:00 and 10:30 local time",
        "(cast) => (hour(cast.timestamp) ?? -1) * 60 + (minute(cast.timestamp) ?? -1) >= 420 \
         && (hour(cast.timestamp) ?? -1) * 60 + (minute(cast.timestamp) ?? -1) <= 630",
    ),
    (
        "Midnight",
        "Posted between 12:00am and 12:59am local time",
        "(cast) => hour(cast.timestamp) == 0",
    ),
    (
        "Buzzer Beater",
        "Posted at minute 59",
        "(cast) => minute(cast.timestamp) == 59",
    ),
    (
        "Web surfer",
        "Contains a URL",
        r"(cast) => /https?:\/\/\S+/.test(cast.text ?? '') || cast.embeds.some(e => 'url' in e)",
    ),
    (
        "Questioner",
        "Contains a question mark",
        "(cast) => (cast.text ?? '').includes('?')",
    ),
    (
        "Liked",
        "100+ likes",
        "(cast) => (cast.reactions?.likes_count ?? 0) >= 100",
    ),
    (
        "Viral",
        "1000+ likes",
        "(cast) => (cast.reactions?.likes_count ?? 0) >= 1000",
    ),
    (
        "Reply'd guy",
        "10+ replies",
        "(cast) => (cast.replies?.count ?? 0) >= 10",
    ),
    (
        "Thought provoking",
        "100+ replies",
        "(cast) => (cast.replies?.count ?? 0) >= 100",
    ),
    (
        "gm",
        "Says gm",
        r"(cast) => /\bgm\b/i.test(cast.text ?? '')",
    ),
    (
        "Quote",
        "Quotes another item",
        "(cast) => cast.embeds.some(e => 'quotedItem' in e || 'quotedItemHash' in e)",
    ),
    (
        "Music",
        "Links to Spotify or Apple Music",
        r"(cast) => /https?:\/\/\S*(open\.spotify\.com|music\.apple\.com)/i.test(cast.text ?? '') || cast.embeds.some(e => 'url' in e && /(open\.spotify\.com|music\.apple\.com)/i.test(e.url))",
    ),
];

/// The default trait pack, every trait enabled and stamped `created_at`.
#[must_use]
pub fn default_traits(created_at: DateTime<Utc>) -> TraitsRegistry {
    PACK.iter()
        .map(|(name, description, code)| {
            (
                (*name).to_string(),
                TraitDefinition::new(*description, *code, created_at),
            )
        })
        .collect()
}
