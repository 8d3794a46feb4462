//! Persistence scenarios against a real directory-backed store.

use castlens_core::cache::{
    CacheMiss, FileStore, INDEX_KEY, KvStore, MemoryStore, load_index, probe_index, save_index,
};
use castlens_core::index::rebuild_all;
use castlens_core::model::ContentItem;
use castlens_core::predicate::PredicateCompiler;
use castlens_core::session::{IndexSource, Session, SessionEvent, SessionOptions};
use castlens_core::traits::{TraitDefinition, TraitsRegistry};
use chrono::Utc;
use tempfile::TempDir;

fn items(n: usize) -> Vec<ContentItem> {
    (0..n)
        .map(|i| ContentItem {
            id: Some(format!("0x{i:03}")),
            text: Some(if i % 2 == 0 { "gm".into() } else { "gn".into() }),
            timestamp: Some("2024-01-15T19:11:00Z".into()),
            ..ContentItem::default()
        })
        .collect()
}

fn registry() -> TraitsRegistry {
    let mut reg = TraitsRegistry::new();
    reg.upsert("gm", TraitDefinition::new("", "c => c.text == 'gm'", Utc::now()));
    reg
}

#[test]
fn saved_index_loads_back_from_disk() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = FileStore::new(tmp.path().join("store"));
    let items = items(5);
    let reg = registry();
    let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);

    assert!(save_index(&mut store, &index, &items, &reg));
    let reopened = FileStore::new(tmp.path().join("store"));
    assert_eq!(load_index(&reopened, &items, &reg), Some(index));
}

#[test]
fn signature_mismatch_is_a_miss() {
    let mut store = MemoryStore::new();
    let items = items(5);
    let reg = registry();
    let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);
    assert!(save_index(&mut store, &index, &items, &reg));

    let mut recoded = reg.clone();
    recoded
        .edit("gm", None, "c => c.text == 'gn'".into())
        .expect("edit");
    assert_eq!(
        probe_index(&store, &items, &recoded),
        Err(CacheMiss::TraitsChanged)
    );
    assert_eq!(
        probe_index(&store, &items[..4], &reg),
        Err(CacheMiss::DatasetChanged)
    );
}

#[test]
fn corrupt_file_triggers_rebuild_on_load() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = FileStore::new(tmp.path());
    let options = SessionOptions {
        seed_defaults: false,
        ..SessionOptions::default()
    };
    let mut session = Session::load(items(4), &mut store, options);
    session
        .apply(
            SessionEvent::TraitAdded {
                name: "gm".into(),
                definition: TraitDefinition::new("", "c => c.text == 'gm'", Utc::now()),
            },
            &mut store,
        )
        .expect("add");

    store.set(INDEX_KEY, "{ truncated").expect("corrupt");
    let reloaded = Session::load(items(4), &mut store, options);
    assert_eq!(reloaded.index_source(), IndexSource::Rebuilt);
    assert_eq!(reloaded.index(), session.index());
    assert_eq!(reloaded.statistics().counts_by_trait.get("gm"), Some(&2));
}

#[test]
fn faulty_trait_is_isolated_from_healthy_ones() {
    let mut reg = registry();
    reg.upsert(
        "explodes",
        TraitDefinition::new("", "c => c.reactions.likes_count > 0", Utc::now()),
    );
    reg.upsert(
        "garbage",
        TraitDefinition::new("", "this is not a predicate", Utc::now()),
    );
    let items = items(6);
    let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);
    for item in &items {
        let names = index.get(&item.stable_key()).expect("entry");
        assert!(!names.contains("explodes"));
        assert!(!names.contains("garbage"));
        assert_eq!(names.contains("gm"), item.text.as_deref() == Some("gm"));
    }
}

#[test]
fn predicates_cannot_see_author_identity() {
    let raw = r#"[{
        "id": "0x1",
        "text": "hi",
        "author": {"fid": 99, "username": "secret-user"},
        "embeds": [{"quotedItem": {"text": "q", "author": {"username": "also-secret"}}}]
    }]"#;
    let items: Vec<ContentItem> = serde_json::from_str(raw).expect("parse");
    let mut reg = TraitsRegistry::new();
    for (name, code) in [
        ("author", "c => c.author != null"),
        ("username", "c => 'author' in c"),
        ("quoted-author", "c => c.embeds[0].quotedItem.author != null"),
        ("sees-text", "c => c.text == 'hi'"),
    ] {
        reg.upsert(name, TraitDefinition::new("", code, Utc::now()));
    }
    let index = rebuild_all(&mut PredicateCompiler::default(), &items, &reg);
    let names: Vec<_> = index.get("0x1").expect("entry").iter().cloned().collect();
    assert_eq!(names, vec!["sees-text".to_string()]);
}
