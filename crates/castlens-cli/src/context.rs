//! Per-invocation context: resolved config, dataset path, store, and the
//! trait session built from them.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono_tz::Tz;

use castlens_core::cache::FileStore;
use castlens_core::config::{EffectiveConfig, resolve_config};
use castlens_core::dataset::load_dataset;
use castlens_core::error::ErrorCode;
use castlens_core::model::ContentItem;
use castlens_core::session::{Session, SessionOptions};

use crate::output::{CliError, OutputMode, fail, resolve_output_mode};

/// Global flags that shape every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalFlags {
    pub data: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub format: Option<OutputMode>,
    pub json: bool,
}

pub struct Context {
    pub config: EffectiveConfig,
    pub output: OutputMode,
    pub data_path: PathBuf,
    pub store_dir: PathBuf,
    pub tz: Tz,
}

impl Context {
    /// Resolve config under `project_root` and apply flag overrides.
    ///
    /// Relative dataset and store paths from config are taken relative to
    /// `project_root`; flag paths are used as given.
    pub fn resolve(project_root: &Path, flags: &GlobalFlags) -> Result<Self> {
        let fallback = resolve_output_mode(flags.format, if flags.json { "json" } else { "text" });
        let config = resolve_config(project_root, flags.json).map_err(|e| {
            fail(fallback, &CliError::from_code(ErrorCode::ConfigParseError, format!("{e:#}")))
        })?;
        let output = resolve_output_mode(flags.format, &config.resolved_output);
        let tz = config.project.search.tz().map_err(|e| {
            fail(output, &CliError::from_code(ErrorCode::ConfigParseError, format!("{e:#}")))
        })?;

        let data_path = flags
            .data
            .clone()
            .unwrap_or_else(|| project_root.join(&config.project.dataset.path));
        let store_dir = flags
            .store
            .clone()
            .unwrap_or_else(|| project_root.join(&config.project.store.dir));

        tracing::debug!(
            data = %data_path.display(),
            store = %store_dir.display(),
            timezone = tz.name(),
            "resolved context"
        );

        Ok(Self {
            config,
            output,
            data_path,
            store_dir,
            tz,
        })
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(&self.store_dir)
    }

    /// Load the dataset, rendering a coded error on failure.
    pub fn load_items(&self) -> Result<Vec<ContentItem>> {
        load_dataset(&self.data_path)
            .map_err(|e| fail(self.output, &CliError::from_code(e.code(), e.to_string())))
    }

    pub const fn session_options(&self) -> SessionOptions {
        SessionOptions {
            timezone: self.tz,
            seed_defaults: self.config.project.traits.seed_defaults,
        }
    }

    /// Load the dataset and open a session over it.
    pub fn open_session(&self) -> Result<(Session, FileStore)> {
        let items = self.load_items()?;
        let mut store = self.store();
        let session = Session::load(items, &mut store, self.session_options());
        Ok((session, store))
    }
}
