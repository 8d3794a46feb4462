//! Content item model and the structural facets derived from it.

pub mod item;
pub mod structure;

pub use item::{Author, ContentItem, Embed, EmbeddedItem, Reactions, Replies};
