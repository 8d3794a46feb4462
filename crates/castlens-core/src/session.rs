//! Explicit session state: dataset, trait registry, trait index, and the
//! compiler cache shared by every index pass.
//!
//! A [`Session`] is created once per loaded dataset with [`Session::load`]
//! and then driven by [`SessionEvent`]s. Every event persists the registry
//! and the index it produces; persistence failures are logged and the
//! session continues in memory.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;

use crate::cache::{KvStore, load_index, load_registry, save_index, save_registry};
use crate::clock::DEFAULT_TIMEZONE;
use crate::index::{self, TraitIndex};
use crate::model::ContentItem;
use crate::predicate::{Predicate, PredicateCompiler};
use crate::stats::{TraitStatistics, aggregate};
use crate::traits::defaults::default_traits;
use crate::traits::{RegistryError, TraitDefinition, TraitsRegistry};

/// Knobs for [`Session::load`].
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Civil timezone for time-of-day builtins.
    pub timezone: Tz,
    /// Seed the default trait pack when no registry is persisted.
    pub seed_defaults: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            seed_defaults: true,
        }
    }
}

/// Where the current index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Persisted index with matching signatures.
    Cache,
    /// Rebuilt from scratch and persisted.
    Rebuilt,
    /// Rebuilt from scratch; persisting it failed (non-fatal).
    RebuiltUnsaved,
}

/// A change to the trait registry, or a request to recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TraitAdded {
        name: String,
        definition: TraitDefinition,
    },
    TraitEdited {
        name: String,
        description: Option<String>,
        code: String,
    },
    TraitToggled {
        name: String,
        enabled: bool,
    },
    TraitDeleted {
        name: String,
    },
    RebuildRequested,
}

#[derive(Debug)]
pub struct Session {
    items: Vec<ContentItem>,
    registry: TraitsRegistry,
    index: TraitIndex,
    compiler: PredicateCompiler,
    source: IndexSource,
}

impl Session {
    /// Start a session over `items`.
    ///
    /// Loads the persisted registry, seeding the default pack when there is
    /// none (or it is empty) and seeding is enabled. Then uses the
    /// persisted index if its signatures match, otherwise rebuilds and
    /// saves.
    pub fn load(items: Vec<ContentItem>, store: &mut dyn KvStore, options: SessionOptions) -> Self {
        let mut registry = load_registry(store).unwrap_or_default();
        if registry.is_empty() && options.seed_defaults {
            registry = default_traits(Utc::now());
            tracing::info!(traits = registry.len(), "seeded default trait pack");
            save_registry(store, &registry);
        }

        let mut compiler = PredicateCompiler::new(options.timezone);
        let (index, source) = match load_index(store, &items, &registry) {
            Some(index) if index.covers(&items) => (index, IndexSource::Cache),
            _ => {
                let index = index::rebuild_all(&mut compiler, &items, &registry);
                let source = if save_index(store, &index, &items, &registry) {
                    IndexSource::Rebuilt
                } else {
                    IndexSource::RebuiltUnsaved
                };
                (index, source)
            }
        };

        Self {
            items,
            registry,
            index,
            compiler,
            source,
        }
    }

    /// Apply one event and persist the result.
    ///
    /// # Errors
    ///
    /// Fails when the event names a missing trait, re-adds an existing
    /// one, or uses an invalid name. State is unchanged on error.
    pub fn apply(&mut self, event: SessionEvent, store: &mut dyn KvStore) -> Result<(), RegistryError> {
        match event {
            SessionEvent::TraitAdded { name, definition } => {
                let code = definition.code.clone();
                self.registry.add(&name, definition)?;
                save_registry(store, &self.registry);
                self.index = index::apply_one(&mut self.compiler, &self.items, &name, &code, &self.index);
            }
            SessionEvent::TraitEdited {
                name,
                description,
                code,
            } => {
                self.registry.edit(&name, description, code.clone())?;
                save_registry(store, &self.registry);
                self.index = index::apply_one(&mut self.compiler, &self.items, &name, &code, &self.index);
            }
            SessionEvent::TraitToggled { name, enabled } => {
                self.registry.set_enabled(&name, enabled)?;
                save_registry(store, &self.registry);
            }
            SessionEvent::TraitDeleted { name } => {
                self.registry.remove(&name)?;
                save_registry(store, &self.registry);
                self.index = index::prune_trait(&self.index, &name);
            }
            SessionEvent::RebuildRequested => {
                self.index = index::rebuild_all(&mut self.compiler, &self.items, &self.registry);
            }
        }
        // Toggling changes the registry signature, so the index is re-saved
        // even when its content is unchanged.
        self.source = if save_index(store, &self.index, &self.items, &self.registry) {
            IndexSource::Rebuilt
        } else {
            IndexSource::RebuiltUnsaved
        };
        Ok(())
    }

    /// Compile `code` through the session's cache.
    pub fn compile(&mut self, code: &str) -> Arc<Predicate> {
        self.compiler.compile(code)
    }

    #[must_use]
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    #[must_use]
    pub const fn registry(&self) -> &TraitsRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn index(&self) -> &TraitIndex {
        &self.index
    }

    #[must_use]
    pub const fn index_source(&self) -> IndexSource {
        self.source
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.compiler.timezone()
    }

    #[must_use]
    pub fn statistics(&self) -> TraitStatistics {
        aggregate(&self.index, &self.registry)
    }

    /// Enabled trait names for one item.
    #[must_use]
    pub fn membership(&self, item: &ContentItem) -> Vec<&str> {
        index::membership(&self.index, &item.stable_key(), &self.registry)
    }
}
