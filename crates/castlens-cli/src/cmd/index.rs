//! `castlens index`: trait index cache inspection and rebuild.

use std::time::Instant;

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use castlens_core::cache::{dataset_signature, load_registry, probe_index, traits_signature};
use castlens_core::session::{IndexSource, SessionEvent};

use super::stats::source_label;
use crate::context::Context;
use crate::output::{CliError, fail, pretty_kv, pretty_section, render};

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Report whether the persisted index matches the dataset and traits.
    Status,
    /// Recompute every trait over every item and persist the result.
    Rebuild,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput {
    dataset: String,
    store: String,
    items: usize,
    traits: usize,
    enabled_traits: usize,
    dataset_signature: String,
    traits_signature: String,
    fresh: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indexed_items: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RebuildOutput {
    items: usize,
    traits: usize,
    source: &'static str,
    saved: bool,
    elapsed_ms: u128,
}

/// Execute `castlens index <command>`.
pub fn run_index(command: &IndexCommand, ctx: &Context) -> Result<()> {
    match command {
        IndexCommand::Status => run_status(ctx),
        IndexCommand::Rebuild => run_rebuild(ctx),
    }
}

fn run_status(ctx: &Context) -> Result<()> {
    let items = ctx.load_items()?;
    let store = ctx.store();
    // Read-only: no seeding, no rebuild.
    let registry = load_registry(&store).unwrap_or_default();
    let probe = probe_index(&store, &items, &registry);

    let payload = StatusOutput {
        dataset: ctx.data_path.display().to_string(),
        store: ctx.store_dir.display().to_string(),
        items: items.len(),
        traits: registry.len(),
        enabled_traits: registry.enabled_names().count(),
        dataset_signature: dataset_signature(&items),
        traits_signature: traits_signature(&registry),
        fresh: probe.is_ok(),
        reason: probe.as_ref().err().map(ToString::to_string),
        indexed_items: probe.as_ref().ok().map(castlens_core::index::TraitIndex::len),
    };

    render(ctx.output, &payload, |p, w| {
        pretty_section(w, "Trait index")?;
        pretty_kv(w, "Dataset", &p.dataset)?;
        pretty_kv(w, "Store", &p.store)?;
        pretty_kv(w, "Items", p.items.to_string())?;
        pretty_kv(w, "Traits", format!("{} ({} enabled)", p.traits, p.enabled_traits))?;
        pretty_kv(w, "Dataset sig", &p.dataset_signature)?;
        pretty_kv(w, "Traits sig", &p.traits_signature)?;
        match &p.reason {
            None => pretty_kv(w, "Cache", "fresh"),
            Some(reason) => pretty_kv(w, "Cache", format!("stale ({reason})")),
        }
    })
}

fn run_rebuild(ctx: &Context) -> Result<()> {
    let started = Instant::now();
    let (mut session, mut store) = ctx.open_session()?;
    session
        .apply(SessionEvent::RebuildRequested, &mut store)
        .map_err(|e| fail(ctx.output, &CliError::from_code(e.code(), e.to_string())))?;

    let source = session.index_source();
    if source == IndexSource::RebuiltUnsaved {
        tracing::warn!(store = %ctx.store_dir.display(), "rebuilt index could not be persisted");
    }
    let payload = RebuildOutput {
        items: session.items().len(),
        traits: session.registry().len(),
        source: source_label(source),
        saved: source != IndexSource::RebuiltUnsaved,
        elapsed_ms: started.elapsed().as_millis(),
    };

    render(ctx.output, &payload, |p, w| {
        writeln!(
            w,
            "rebuilt trait index: {} items, {} traits in {}ms",
            p.items, p.traits, p.elapsed_ms
        )?;
        if !p.saved {
            writeln!(w, "warning: index could not be persisted")?;
        }
        Ok(())
    })
}
