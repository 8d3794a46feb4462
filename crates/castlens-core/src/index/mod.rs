//! Trait index: which traits each item satisfies.
//!
//! The index maps every item's stable key to the set of trait names whose
//! predicates match it. Disabled traits are evaluated and stored like any
//! other; readers filter by the registry's `enabled` flag at read time, so
//! toggling a trait never requires re-evaluation.
//!
//! All builders are pure: they return a new index and never mutate their
//! input. Each item is sanitized once per build and each trait compiled
//! once, through the shared [`PredicateCompiler`].

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::model::ContentItem;
use crate::predicate::{PredicateCompiler, Value};
use crate::sanitize::sanitize;
use crate::traits::TraitsRegistry;

/// Stable item key to matching trait names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitIndex(BTreeMap<String, BTreeSet<String>>);

impl TraitIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every trait name recorded for `key`, enabled or not. `None` means the
    /// item has not been indexed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `true` if every item in `items` has an entry.
    #[must_use]
    pub fn covers(&self, items: &[ContentItem]) -> bool {
        items.iter().all(|item| self.0.contains_key(&item.stable_key()))
    }

    /// Names recorded for `key` that are enabled in `registry`.
    #[must_use]
    pub fn enabled_for<'a>(&'a self, key: &str, registry: &TraitsRegistry) -> Vec<&'a str> {
        self.0.get(key).map_or_else(Vec::new, |names| {
            names
                .iter()
                .map(String::as_str)
                .filter(|name| registry.is_enabled(name))
                .collect()
        })
    }

    /// Count of enabled traits recorded for `key`.
    #[must_use]
    pub fn enabled_count(&self, key: &str, registry: &TraitsRegistry) -> usize {
        self.0.get(key).map_or(0, |names| {
            names.iter().filter(|name| registry.is_enabled(name)).count()
        })
    }
}

/// Sanitized predicate views of `items`, built once per index pass.
fn views(items: &[ContentItem]) -> Vec<(String, Value)> {
    items
        .iter()
        .map(|item| (item.stable_key(), Value::from(&sanitize(item))))
        .collect()
}

/// Evaluate every trait in `registry`, enabled or not, against every item.
///
/// Every item gets an entry, possibly empty. Deterministic: the same
/// inputs always produce the same index.
#[must_use]
pub fn rebuild_all(
    compiler: &mut PredicateCompiler,
    items: &[ContentItem],
    registry: &TraitsRegistry,
) -> TraitIndex {
    let started = Instant::now();
    let predicates: Vec<_> = registry
        .iter()
        .map(|(name, def)| (name, compiler.compile(&def.code)))
        .collect();

    let mut index = BTreeMap::new();
    for (key, view) in views(items) {
        let matched: BTreeSet<String> = predicates
            .iter()
            .filter(|(_, predicate)| predicate.matches(&view))
            .map(|(name, _)| (*name).to_string())
            .collect();
        index
            .entry(key)
            .or_insert_with(BTreeSet::new)
            .extend(matched);
    }

    tracing::info!(
        items = items.len(),
        traits = predicates.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "rebuilt trait index"
    );
    TraitIndex(index)
}

/// Recompute membership of one trait, leaving every other name in `prior`
/// untouched. Items missing from `prior` get an entry.
#[must_use]
pub fn apply_one(
    compiler: &mut PredicateCompiler,
    items: &[ContentItem],
    name: &str,
    code: &str,
    prior: &TraitIndex,
) -> TraitIndex {
    let predicate = compiler.compile(code);
    let mut next = prior.0.clone();
    for names in next.values_mut() {
        names.remove(name);
    }
    let mut matched = 0usize;
    for (key, view) in views(items) {
        let names = next.entry(key).or_default();
        if predicate.matches(&view) {
            names.insert(name.to_string());
            matched += 1;
        }
    }
    tracing::debug!(trait_name = name, matched, "applied trait to index");
    TraitIndex(next)
}

/// Remove `name` from every entry.
#[must_use]
pub fn prune_trait(index: &TraitIndex, name: &str) -> TraitIndex {
    let mut next = index.0.clone();
    for names in next.values_mut() {
        names.remove(name);
    }
    TraitIndex(next)
}

/// Enabled trait names for one item, in name order. Empty when the item is
/// unindexed.
#[must_use]
pub fn membership<'a>(
    index: &'a TraitIndex,
    key: &str,
    registry: &TraitsRegistry,
) -> Vec<&'a str> {
    index.enabled_for(key, registry)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::traits::TraitDefinition;

    fn item(id: &str, text: &str) -> ContentItem {
        ContentItem {
            id: Some(id.into()),
            text: Some(text.into()),
            ..ContentItem::default()
        }
    }

    fn registry(traits: &[(&str, &str)]) -> TraitsRegistry {
        traits
            .iter()
            .map(|(name, code)| {
                (
                    (*name).to_string(),
                    TraitDefinition::new("", *code, Utc::now()),
                )
            })
            .collect()
    }

    #[test]
    fn rebuild_records_every_item() {
        let items = vec![item("a", "gm"), item("b", "hello")];
        let reg = registry(&[("gm", "c => c.text == 'gm'")]);
        let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);
        assert_eq!(index.len(), 2);
        assert!(index.get("a").is_some_and(|n| n.contains("gm")));
        assert!(index.get("b").is_some_and(BTreeSet::is_empty));
    }

    #[test]
    fn disabled_traits_are_indexed_but_filtered_on_read() {
        let items = vec![item("a", "gm")];
        let mut reg = registry(&[("gm", "c => true"), ("other", "c => true")]);
        reg.set_enabled("other", false).expect("toggle");
        let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);
        assert_eq!(index.get("a").map(BTreeSet::len), Some(2));
        assert_eq!(membership(&index, "a", &reg), vec!["gm"]);
        assert_eq!(index.enabled_count("a", &reg), 1);
        assert!(membership(&index, "missing", &reg).is_empty());
    }

    #[test]
    fn apply_one_only_touches_its_trait() {
        let items = vec![item("a", "gm"), item("b", "gn")];
        let reg = registry(&[("gm", "c => c.text == 'gm'"), ("any", "c => true")]);
        let mut compiler = PredicateCompiler::default();
        let prior = rebuild_all(&mut compiler, &items, &reg);
        let next = apply_one(&mut compiler, &items, "gm", "c => c.text == 'gn'", &prior);
        assert!(next.get("a").is_some_and(|n| !n.contains("gm") && n.contains("any")));
        assert!(next.get("b").is_some_and(|n| n.contains("gm") && n.contains("any")));
        assert!(prior.get("a").is_some_and(|n| n.contains("gm")), "prior untouched");
    }

    #[test]
    fn faulty_trait_does_not_disturb_others() {
        let items = vec![item("a", "x")];
        let reg = registry(&[
            ("broken", "c => c.reactions.likes_count > 0"),
            ("syntax", "c => (("),
            ("fine", "c => true"),
        ]);
        let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);
        let names: Vec<_> = index.get("a").expect("entry").iter().cloned().collect();
        assert_eq!(names, vec!["fine".to_string()]);
    }

    #[test]
    fn prune_removes_name_everywhere() {
        let items = vec![item("a", "x"), item("b", "y")];
        let reg = registry(&[("t", "c => true"), ("u", "c => true")]);
        let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);
        let pruned = prune_trait(&index, "t");
        assert!(pruned.iter().all(|(_, names)| !names.contains("t") && names.contains("u")));
        assert_eq!(pruned.len(), 2);
    }
}
