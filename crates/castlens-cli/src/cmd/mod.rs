pub mod completions;
pub mod index;
pub mod sample;
pub mod search;
pub mod stats;
pub mod traits;

use serde::Serialize;

use castlens_core::model::ContentItem;
use castlens_core::session::Session;

/// An item as printed by `search` and `sample`: the item itself plus its
/// enabled trait names.
#[derive(Debug, Serialize)]
pub struct ItemRow<'a> {
    pub key: String,
    #[serde(flatten)]
    pub item: &'a ContentItem,
    pub traits: Vec<&'a str>,
}

impl<'a> ItemRow<'a> {
    pub fn new(item: &'a ContentItem, session: &'a Session) -> Self {
        Self {
            key: item.stable_key(),
            item,
            traits: session.membership(item),
        }
    }

    pub fn author(&self) -> &str {
        self.item
            .author
            .as_ref()
            .and_then(|a| a.username.as_deref())
            .unwrap_or("-")
    }

    pub fn timestamp(&self) -> &str {
        self.item.timestamp.as_deref().unwrap_or("-")
    }
}
