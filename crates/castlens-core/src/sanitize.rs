//! Allow-listed projection of a content item for trait predicates.
//!
//! Predicate source text is untrusted (hand- or LLM-authored), so a predicate
//! never sees a [`ContentItem`]. It sees a [`SanitizedItem`]: a freshly
//! allocated copy holding only the fields listed here. Author identity,
//! quoted authors, and anything added to the model later stay out unless
//! they are added to this projection explicitly.
//!
//! Embeds keep their variant but are reduced to the discriminating fields.
//! Quoted items are projected one level deep; a quote nested inside a quote
//! keeps only its text and timestamp.

use serde::Serialize;

use crate::model::{ContentItem, Embed, EmbeddedItem, Reactions, Replies};

/// The view of an item that trait predicates evaluate against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Replies>,
    pub embeds: Vec<SanitizedEmbed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_author_id: Option<u64>,
}

/// A top-level embed reduced to its discriminating field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SanitizedEmbed {
    Link {
        url: String,
    },
    QuotedItemRef {
        #[serde(rename = "quotedItemHash")]
        quoted_item_hash: String,
    },
    QuotedItem {
        #[serde(rename = "quotedItem")]
        quoted_item: SanitizedQuote,
    },
}

/// A directly quoted item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanitizedQuote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub embeds: Vec<NestedEmbed>,
}

/// An embed of a quoted item. Nothing below this level is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NestedEmbed {
    Link {
        url: String,
    },
    QuotedItemRef {
        #[serde(rename = "quotedItemHash")]
        quoted_item_hash: String,
    },
    QuotedItem {
        #[serde(rename = "quotedItem")]
        quoted_item: NestedQuote,
    },
}

/// A quote inside a quote: text and timestamp only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NestedQuote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Project `item` to the predicate-visible view. Pure; never aliases `item`.
#[must_use]
pub fn sanitize(item: &ContentItem) -> SanitizedItem {
    SanitizedItem {
        id: item.id.clone(),
        text: item.text.clone(),
        timestamp: item.timestamp.clone(),
        reactions: item.reactions.as_ref().map(|r| Reactions {
            likes_count: r.likes_count,
            recasts_count: r.recasts_count,
        }),
        replies: item.replies.as_ref().map(|r| Replies { count: r.count }),
        embeds: item.embeds.iter().map(sanitize_embed).collect(),
        parent_hash: item.parent_hash.clone(),
        parent_author_id: item.parent_author_id,
    }
}

fn sanitize_embed(embed: &Embed) -> SanitizedEmbed {
    match embed {
        Embed::Link { url } => SanitizedEmbed::Link { url: url.clone() },
        Embed::QuotedItemRef { quoted_item_hash } => SanitizedEmbed::QuotedItemRef {
            quoted_item_hash: quoted_item_hash.clone(),
        },
        Embed::QuotedItem { quoted_item } => SanitizedEmbed::QuotedItem {
            quoted_item: sanitize_quote(quoted_item),
        },
    }
}

fn sanitize_quote(quoted: &EmbeddedItem) -> SanitizedQuote {
    SanitizedQuote {
        text: quoted.text.clone(),
        timestamp: quoted.timestamp.clone(),
        embeds: quoted.embeds.iter().map(sanitize_nested_embed).collect(),
    }
}

fn sanitize_nested_embed(embed: &Embed) -> NestedEmbed {
    match embed {
        Embed::Link { url } => NestedEmbed::Link { url: url.clone() },
        Embed::QuotedItemRef { quoted_item_hash } => NestedEmbed::QuotedItemRef {
            quoted_item_hash: quoted_item_hash.clone(),
        },
        Embed::QuotedItem { quoted_item } => NestedEmbed::QuotedItem {
            quoted_item: NestedQuote {
                text: quoted_item.text.clone(),
                timestamp: quoted_item.timestamp.clone(),
            },
        },
    }
}
