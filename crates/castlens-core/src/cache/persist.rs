//! Versioned records for the trait registry and the trait index.
//!
//! A persisted index is trusted only while the dataset and registry
//! signatures recorded beside it still match. Every way a record can be
//! unusable is a cache miss; the caller rebuilds. Write failures are
//! logged and swallowed: the session keeps working in memory.

use serde::{Deserialize, Serialize};

use crate::cache::signature::{dataset_signature, traits_signature};
use crate::cache::store::KvStore;
use crate::index::TraitIndex;
use crate::model::ContentItem;
use crate::traits::TraitsRegistry;

/// Store key for the registry record.
pub const TRAITS_KEY: &str = "castlens_traits_v1";
/// Store key for the index record.
pub const INDEX_KEY: &str = "castlens_trait_index_v1";
/// Schema version written into both records.
pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedIndexRecord {
    pub version: u32,
    pub dataset_signature: String,
    pub traits_signature: String,
    pub index: TraitIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRegistryRecord {
    pub version: u32,
    pub traits: TraitsRegistry,
}

/// Why a persisted index was not used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheMiss {
    #[error("no persisted index")]
    Missing,

    #[error("store read failed: {0}")]
    Unreadable(String),

    #[error("persisted index is malformed: {0}")]
    Malformed(String),

    #[error("persisted index has version {found}, expected {RECORD_VERSION}")]
    WrongVersion { found: u32 },

    #[error("dataset changed since the index was saved")]
    DatasetChanged,

    #[error("traits changed since the index was saved")]
    TraitsChanged,
}

/// Fetch the persisted index and report exactly why it is unusable.
///
/// # Errors
///
/// Returns the [`CacheMiss`] reason when the record cannot be used.
pub fn probe_index(
    store: &dyn KvStore,
    items: &[ContentItem],
    registry: &TraitsRegistry,
) -> Result<TraitIndex, CacheMiss> {
    let raw = store
        .get(INDEX_KEY)
        .map_err(|e| CacheMiss::Unreadable(e.to_string()))?
        .ok_or(CacheMiss::Missing)?;
    let record: PersistedIndexRecord =
        serde_json::from_str(&raw).map_err(|e| CacheMiss::Malformed(e.to_string()))?;
    if record.version != RECORD_VERSION {
        return Err(CacheMiss::WrongVersion {
            found: record.version,
        });
    }
    if record.dataset_signature != dataset_signature(items) {
        return Err(CacheMiss::DatasetChanged);
    }
    if record.traits_signature != traits_signature(registry) {
        return Err(CacheMiss::TraitsChanged);
    }
    Ok(record.index)
}

/// Load the persisted index if it is valid for `items` and `registry`.
#[must_use]
pub fn load_index(
    store: &dyn KvStore,
    items: &[ContentItem],
    registry: &TraitsRegistry,
) -> Option<TraitIndex> {
    match probe_index(store, items, registry) {
        Ok(index) => {
            tracing::debug!(entries = index.len(), "trait index cache hit");
            Some(index)
        }
        Err(CacheMiss::Unreadable(reason)) => {
            tracing::warn!("trait index cache unreadable: {reason}");
            None
        }
        Err(miss) => {
            tracing::debug!("trait index cache miss: {miss}");
            None
        }
    }
}

/// Persist `index` with signatures of `items` and `registry`.
///
/// Returns `false` if the write failed. Failures are logged, never raised.
pub fn save_index(
    store: &mut dyn KvStore,
    index: &TraitIndex,
    items: &[ContentItem],
    registry: &TraitsRegistry,
) -> bool {
    let record = PersistedIndexRecord {
        version: RECORD_VERSION,
        dataset_signature: dataset_signature(items),
        traits_signature: traits_signature(registry),
        index: index.clone(),
    };
    write_record(store, INDEX_KEY, &record)
}

/// Load the persisted registry. Missing, unreadable, malformed, and
/// wrong-version records all yield `None`.
#[must_use]
pub fn load_registry(store: &dyn KvStore) -> Option<TraitsRegistry> {
    let raw = match store.get(TRAITS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("trait registry unreadable: {e}");
            return None;
        }
    };
    match serde_json::from_str::<PersistedRegistryRecord>(&raw) {
        Ok(record) if record.version == RECORD_VERSION => Some(record.traits),
        Ok(record) => {
            tracing::warn!(version = record.version, "ignoring trait registry with unknown version");
            None
        }
        Err(e) => {
            tracing::warn!("ignoring malformed trait registry: {e}");
            None
        }
    }
}

/// Persist the registry. Returns `false` if the write failed.
pub fn save_registry(store: &mut dyn KvStore, registry: &TraitsRegistry) -> bool {
    let record = PersistedRegistryRecord {
        version: RECORD_VERSION,
        traits: registry.clone(),
    };
    write_record(store, TRAITS_KEY, &record)
}

fn write_record<T: Serialize>(store: &mut dyn KvStore, key: &str, record: &T) -> bool {
    let body = match serde_json::to_string(record) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(key, "failed to serialize record: {e}");
            return false;
        }
    };
    match store.set(key, &body) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(key, "failed to persist record, continuing in memory: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cache::store::{MemoryStore, StoreError};
    use crate::traits::TraitDefinition;

    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota exceeded".into()))
        }
    }

    fn items() -> Vec<ContentItem> {
        vec![ContentItem {
            id: Some("0x1".into()),
            text: Some("gm".into()),
            ..ContentItem::default()
        }]
    }

    fn registry() -> TraitsRegistry {
        let mut reg = TraitsRegistry::new();
        reg.upsert("gm", TraitDefinition::new("", "c => true", Utc::now()));
        reg
    }

    #[test]
    fn missing_malformed_and_wrong_version_are_misses() {
        let mut store = MemoryStore::new();
        assert_eq!(
            probe_index(&store, &items(), &registry()),
            Err(CacheMiss::Missing)
        );
        store.set(INDEX_KEY, "not json").expect("set");
        assert!(matches!(
            probe_index(&store, &items(), &registry()),
            Err(CacheMiss::Malformed(_))
        ));
        let record = serde_json::json!({
            "version": 2,
            "datasetSignature": dataset_signature(&items()),
            "traitsSignature": traits_signature(&registry()),
            "index": {}
        });
        store.set(INDEX_KEY, &record.to_string()).expect("set");
        assert_eq!(
            probe_index(&store, &items(), &registry()),
            Err(CacheMiss::WrongVersion { found: 2 })
        );
    }

    #[test]
    fn store_faults_are_swallowed() {
        let mut store = BrokenStore;
        assert!(!save_index(&mut store, &TraitIndex::new(), &items(), &registry()));
        assert!(!save_registry(&mut store, &registry()));
        assert!(load_index(&store, &items(), &registry()).is_none());
        assert!(load_registry(&store).is_none());
    }

    #[test]
    fn registry_record_carries_version() {
        let mut store = MemoryStore::new();
        let reg = registry();
        assert!(save_registry(&mut store, &reg));
        let raw = store.get(TRAITS_KEY).expect("get").expect("present");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(json["version"], 1);
        assert!(json["traits"]["gm"]["createdAt"].is_string());
        assert_eq!(load_registry(&store), Some(reg));
    }
}
