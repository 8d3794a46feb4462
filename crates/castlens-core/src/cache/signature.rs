//! Content signatures that decide whether a persisted index is still valid.
//!
//! Both signatures are BLAKE3 digests over canonical JSON, formatted as
//! `blake3:<hex>`. Serialization goes through fixed-order structs and
//! `BTreeMap`s, so equal inputs always hash equal.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::ContentItem;
use crate::traits::TraitsRegistry;

/// Items sampled from each end of the dataset.
const EDGE_ITEMS: usize = 10;
/// Characters of text used in an edge key when an item has no id.
const KEY_TEXT_CHARS: usize = 16;

#[derive(Serialize)]
struct EdgeItem<'a> {
    k: String,
    t: &'a str,
}

#[derive(Serialize)]
struct DatasetShape<'a> {
    n: usize,
    first: Vec<EdgeItem<'a>>,
    last: Vec<EdgeItem<'a>>,
}

#[derive(Serialize)]
struct TraitShape<'a> {
    code: &'a str,
    enabled: bool,
}

fn edge_item(item: &ContentItem) -> EdgeItem<'_> {
    let timestamp = item.timestamp.as_deref().unwrap_or("");
    let k = match item.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let text: String = item.text_or_empty().chars().take(KEY_TEXT_CHARS).collect();
            format!("{timestamp}|{text}")
        }
    };
    EdgeItem { k, t: timestamp }
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(bytes);
    format!("blake3:{}", hasher.finalize())
}

fn digest_json<T: Serialize>(value: &T) -> String {
    // Serializing these plain structs cannot fail; an empty body still
    // yields a stable digest.
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    digest(&bytes)
}

/// Signature of a dataset: its length plus the first and last
/// [`EDGE_ITEMS`] items.
///
/// This is a deliberate approximation. Edits confined to the middle of a
/// large dataset do not change it.
#[must_use]
pub fn dataset_signature(items: &[ContentItem]) -> String {
    let tail_start = items.len().saturating_sub(EDGE_ITEMS);
    let shape = DatasetShape {
        n: items.len(),
        first: items.iter().take(EDGE_ITEMS).map(edge_item).collect(),
        last: items[tail_start..].iter().map(edge_item).collect(),
    };
    digest_json(&shape)
}

/// Signature of a registry over each trait's name, code, and enabled flag.
/// Descriptions and creation times do not participate.
#[must_use]
pub fn traits_signature(registry: &TraitsRegistry) -> String {
    let shape: BTreeMap<&str, TraitShape<'_>> = registry
        .iter()
        .map(|(name, def)| {
            (
                name,
                TraitShape {
                    code: &def.code,
                    enabled: def.enabled,
                },
            )
        })
        .collect();
    digest_json(&shape)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::traits::TraitDefinition;

    fn item(id: Option<&str>, text: &str, ts: &str) -> ContentItem {
        ContentItem {
            id: id.map(String::from),
            text: Some(text.into()),
            timestamp: Some(ts.into()),
            ..ContentItem::default()
        }
    }

    fn registry() -> TraitsRegistry {
        let mut reg = TraitsRegistry::new();
        reg.upsert("gm", TraitDefinition::new("says gm", "c => true", Utc::now()));
        reg
    }

    #[test]
    fn signatures_are_prefixed_and_deterministic() {
        let items = vec![item(Some("0x1"), "a", "2024-01-01T00:00:00Z")];
        let a = dataset_signature(&items);
        assert!(a.starts_with("blake3:"));
        assert_eq!(a, dataset_signature(&items.clone()));
        assert_eq!(traits_signature(&registry()), traits_signature(&registry()));
    }

    #[test]
    fn dataset_signature_tracks_length_and_edges() {
        let items: Vec<_> = (0..30)
            .map(|i| item(Some(&format!("0x{i}")), "t", "2024-01-01T00:00:00Z"))
            .collect();
        let base = dataset_signature(&items);

        let mut longer = items.clone();
        longer.push(item(Some("0xnew"), "t", "2024-01-02T00:00:00Z"));
        assert_ne!(base, dataset_signature(&longer));

        let mut first_changed = items.clone();
        first_changed[0].id = Some("0xchanged".into());
        assert_ne!(base, dataset_signature(&first_changed));

        // Middle edits are invisible by construction.
        let mut middle_changed = items;
        middle_changed[15].id = Some("0xchanged".into());
        assert_eq!(base, dataset_signature(&middle_changed));
    }

    #[test]
    fn idless_items_key_on_timestamp_and_text_prefix() {
        let a = vec![item(None, "0123456789abcdefXXX", "2024-01-01T00:00:00Z")];
        let b = vec![item(None, "0123456789abcdefYYY", "2024-01-01T00:00:00Z")];
        assert_eq!(dataset_signature(&a), dataset_signature(&b));
    }

    #[test]
    fn traits_signature_ignores_description_and_created_at() {
        let base = traits_signature(&registry());

        let mut described = registry();
        described.upsert(
            "gm",
            TraitDefinition::new("other words", "c => true", chrono::DateTime::<Utc>::default()),
        );
        assert_eq!(base, traits_signature(&described));

        let mut recoded = registry();
        recoded.edit("gm", None, "c => false".into()).expect("edit");
        assert_ne!(base, traits_signature(&recoded));

        let mut toggled = registry();
        toggled.set_enabled("gm", false).expect("toggle");
        assert_ne!(base, traits_signature(&toggled));
    }
}
