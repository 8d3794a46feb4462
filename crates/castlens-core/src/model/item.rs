//! Content item model.
//!
//! A [`ContentItem`] is one post from the loaded corpus. Everything except the
//! embed variant is optional because upstream exports routinely drop fields;
//! deserialization tolerates missing fields and unknown embed shapes rather
//! than rejecting the whole dataset.
//!
//! Field spellings follow the camelCase wire format (`parentHash`,
//! `quotedItemHash`, ...). The snake_case spellings used by older exports
//! (`hash`, `parent_hash`, `cast_id_hash`, `cast`) are accepted as aliases.

use serde::{Deserialize, Deserializer, Serialize};

/// One post in the corpus. Treated as immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Stable content hash. May be absent in partial exports.
    #[serde(default, alias = "hash", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// ISO-8601 timestamp, kept as the raw string from the export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Author identity. Never exposed to trait predicates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Replies>,
    #[serde(
        default,
        deserialize_with = "deserialize_embeds",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub embeds: Vec<Embed>,
    #[serde(default, alias = "parent_hash", skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<String>,
    #[serde(
        default,
        alias = "parent_author",
        deserialize_with = "deserialize_author_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_author_id: Option<u64>,
}

/// Author identity attached to an item or a quoted item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub fid: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pfp_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recasts_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// One embed attached to an item.
///
/// Exactly three variants exist. On the wire they are distinguished by which
/// key is present; in memory the variant is explicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Embed {
    /// An external URL (image, article, ...).
    Link { url: String },
    /// A quoted item known only by its hash.
    QuotedItemRef {
        #[serde(rename = "quotedItemHash", alias = "cast_id_hash")]
        quoted_item_hash: String,
    },
    /// A quoted item carried inline.
    QuotedItem {
        #[serde(rename = "quotedItem", alias = "cast")]
        quoted_item: Box<EmbeddedItem>,
    },
}

/// An item quoted inside another item's embeds.
///
/// Only one level of quoting is interpreted: a quote inside a quote is kept
/// for round-tripping but nothing reads past its text and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(
        default,
        deserialize_with = "deserialize_embeds",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub embeds: Vec<Embed>,
}

impl ContentItem {
    /// Identity key used by the trait index.
    ///
    /// `id` when present and non-empty, otherwise `timestamp|text`. The
    /// fallback is deterministic but not collision-free: two items sharing a
    /// timestamp and text collapse onto one key.
    #[must_use]
    pub fn stable_key(&self) -> String {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!(
                "{}|{}",
                self.timestamp.as_deref().unwrap_or(""),
                self.text.as_deref().unwrap_or("")
            ),
        }
    }

    /// Own text, or `""` when missing.
    #[must_use]
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Like count, missing treated as zero.
    #[must_use]
    pub fn likes(&self) -> u64 {
        self.reactions
            .as_ref()
            .and_then(|r| r.likes_count)
            .unwrap_or(0)
    }

    /// Reply count, missing treated as zero.
    #[must_use]
    pub fn reply_count(&self) -> u64 {
        self.replies.as_ref().and_then(|r| r.count).unwrap_or(0)
    }

    /// Items quoted inline at the top level of this item's embeds.
    pub fn quoted_items(&self) -> impl Iterator<Item = &EmbeddedItem> {
        self.embeds.iter().filter_map(|embed| match embed {
            Embed::QuotedItem { quoted_item } => Some(quoted_item.as_ref()),
            _ => None,
        })
    }
}

impl Embed {
    /// URL carried by a [`Embed::Link`].
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Link { url } => Some(url),
            _ => None,
        }
    }
}

/// Parse an embed list, dropping entries that match none of the variants.
fn deserialize_embeds<'de, D>(deserializer: D) -> Result<Vec<Embed>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    let mut embeds = Vec::new();
    for value in raw.unwrap_or_default() {
        match serde_json::from_value::<Embed>(value) {
            Ok(embed) => embeds.push(embed),
            Err(e) => tracing::trace!("skipping unrecognized embed: {e}"),
        }
    }
    Ok(embeds)
}

/// Accept either a bare numeric id or a `{ "fid": n }` object.
fn deserialize_author_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::Object(map)) => {
            map.get("fid").and_then(serde_json::Value::as_u64)
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_key_prefers_id() {
        let item = ContentItem {
            id: Some("0xabc".into()),
            text: Some("hello".into()),
            timestamp: Some("2024-01-01T00:00:00Z".into()),
            ..ContentItem::default()
        };
        assert_eq!(item.stable_key(), "0xabc");
    }

    #[test]
    fn stable_key_falls_back_to_timestamp_and_text() {
        let item = ContentItem {
            id: Some(String::new()),
            text: Some("hello".into()),
            timestamp: Some("2024-01-01T00:00:00Z".into()),
            ..ContentItem::default()
        };
        assert_eq!(item.stable_key(), "2024-01-01T00:00:00Z|hello");
        assert_eq!(ContentItem::default().stable_key(), "|");
    }

    #[test]
    fn parses_camel_case_embeds() {
        let raw = r#"{
            "id": "0x1",
            "text": "look",
            "embeds": [
                {"url": "https://example.com/a.png"},
                {"quotedItemHash": "0x2"},
                {"quotedItem": {"text": "inner", "embeds": [{"url": "https://x.io"}]}}
            ],
            "parentAuthorId": 42
        }"#;
        let item: ContentItem = serde_json::from_str(raw).expect("parse item");
        assert_eq!(item.embeds.len(), 3);
        assert!(matches!(item.embeds[0], Embed::Link { .. }));
        assert!(matches!(item.embeds[1], Embed::QuotedItemRef { .. }));
        let quoted: Vec<_> = item.quoted_items().collect();
        assert_eq!(quoted.len(), 1);
        assert_eq!(quoted[0].text.as_deref(), Some("inner"));
        assert_eq!(item.parent_author_id, Some(42));
    }

    #[test]
    fn parses_legacy_snake_case_shape() {
        let raw = r#"{
            "hash": "0x9",
            "text": "gm",
            "parent_hash": null,
            "parent_author": {"fid": 7},
            "reactions": {"likes_count": 3},
            "embeds": [{"cast_id_hash": "0x3"}, {"cast": {"text": "q"}}, {"weird": true}]
        }"#;
        let item: ContentItem = serde_json::from_str(raw).expect("parse item");
        assert_eq!(item.id.as_deref(), Some("0x9"));
        assert_eq!(item.parent_author_id, Some(7));
        assert_eq!(item.likes(), 3);
        assert_eq!(item.reply_count(), 0);
        assert_eq!(item.embeds.len(), 2, "unknown embed shape is dropped");
    }
}
