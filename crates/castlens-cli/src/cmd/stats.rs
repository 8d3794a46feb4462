//! `castlens stats`: trait coverage dashboard.

use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use castlens_core::session::IndexSource;
use castlens_core::stats::Distribution;

use crate::context::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

/// Arguments for `castlens stats`.
#[derive(Args, Debug, Default)]
pub struct StatsArgs {}

#[derive(Debug, Serialize)]
struct TraitRow {
    name: String,
    count: usize,
    percent: f64,
}

/// Report payload for `castlens stats`.
#[derive(Debug, Serialize)]
struct StatsOutput {
    total_items: usize,
    index: &'static str,
    traits: Vec<TraitRow>,
    counts_by_trait: BTreeMap<String, usize>,
    distribution: Distribution,
}

pub const fn source_label(source: IndexSource) -> &'static str {
    match source {
        IndexSource::Cache => "cache",
        IndexSource::Rebuilt => "rebuilt",
        IndexSource::RebuiltUnsaved => "rebuilt-unsaved",
    }
}

/// Execute `castlens stats`.
pub fn run_stats(_args: &StatsArgs, ctx: &Context) -> Result<()> {
    let (session, _store) = ctx.open_session()?;
    let total_items = session.items().len();
    let stats = session.statistics();
    let percentages = stats.percentages(total_items);

    let mut traits: Vec<TraitRow> = stats
        .counts_by_trait
        .iter()
        .map(|(name, count)| TraitRow {
            name: name.clone(),
            count: *count,
            percent: percentages.get(name).copied().unwrap_or(0.0),
        })
        .collect();
    traits.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

    let payload = StatsOutput {
        total_items,
        index: source_label(session.index_source()),
        traits,
        counts_by_trait: stats.counts_by_trait,
        distribution: stats.distribution,
    };
    render_mode(ctx.output, &payload, render_stats_text, render_stats_pretty)
}

fn render_stats_text(stats: &StatsOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "total\t{}", stats.total_items)?;
    for row in &stats.traits {
        writeln!(w, "trait\t{}\t{}\t{:.1}", row.name, row.count, row.percent)?;
    }
    let d = &stats.distribution;
    writeln!(w, "distribution\t0\t{}", d.zero)?;
    writeln!(w, "distribution\t1\t{}", d.one)?;
    writeln!(w, "distribution\t2\t{}", d.two)?;
    writeln!(w, "distribution\t3+\t{}", d.three_plus)
}

fn render_stats_pretty(stats: &StatsOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Corpus")?;
    pretty_kv(w, "Items", stats.total_items.to_string())?;
    pretty_kv(w, "Trait index", stats.index)?;
    writeln!(w)?;

    pretty_section(w, "Traits")?;
    if stats.traits.is_empty() {
        writeln!(w, "No enabled traits.")?;
    }
    for row in &stats.traits {
        writeln!(w, "{:<28} {:>6}  {:>5.1}%", row.name, row.count, row.percent)?;
    }
    writeln!(w)?;

    pretty_section(w, "Traits per item")?;
    let d = &stats.distribution;
    pretty_kv(w, "0", d.zero.to_string())?;
    pretty_kv(w, "1", d.one.to_string())?;
    pretty_kv(w, "2", d.two.to_string())?;
    pretty_kv(w, "3+", d.three_plus.to_string())
}
