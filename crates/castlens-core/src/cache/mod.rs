//! Persistence of the trait registry and trait index.
//!
//! - [`store`]: the [`KvStore`] abstraction with in-memory and
//!   directory-backed implementations.
//! - [`signature`]: dataset and registry fingerprints.
//! - [`persist`]: versioned records and the load/save policy built on them.

pub mod persist;
pub mod signature;
pub mod store;

pub use persist::{
    CacheMiss, INDEX_KEY, TRAITS_KEY, load_index, load_registry, probe_index, save_index,
    save_registry,
};
pub use signature::{dataset_signature, traits_signature};
pub use store::{FileStore, KvStore, MemoryStore, StoreError};
