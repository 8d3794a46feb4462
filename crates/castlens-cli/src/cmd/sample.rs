//! `castlens sample`: weighted random draw.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use castlens_sample::sample;

use super::ItemRow;
use crate::context::Context;
use crate::output::{pretty_section, render_mode, snippet};

/// Arguments for `castlens sample`.
#[derive(Args, Debug, Default)]
pub struct SampleArgs {
    /// Seed the draw for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SampleOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    items: Vec<ItemRow<'a>>,
}

/// Execute `castlens sample`.
pub fn run_sample(args: &SampleArgs, ctx: &Context) -> Result<()> {
    let (session, _store) = ctx.open_session()?;
    let mut rng = args.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    let drawn = sample(session.items(), session.index(), session.registry(), &mut rng);
    let payload = SampleOutput {
        seed: args.seed,
        items: drawn.into_iter().map(|item| ItemRow::new(item, &session)).collect(),
    };
    render_mode(ctx.output, &payload, render_sample_text, render_sample_pretty)
}

fn render_sample_text(out: &SampleOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    for row in &out.items {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            row.key,
            row.timestamp(),
            row.traits.join(","),
            snippet(row.item.text_or_empty(), 120)
        )?;
    }
    Ok(())
}

fn render_sample_pretty(out: &SampleOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Sample")?;
    if out.items.is_empty() {
        return writeln!(w, "Dataset is empty.");
    }
    for (n, row) in out.items.iter().enumerate() {
        writeln!(w, "{}. {}  @{}  {}", n + 1, row.key, row.author(), row.timestamp())?;
        writeln!(w, "   {}", snippet(row.item.text_or_empty(), 100))?;
        if !row.traits.is_empty() {
            writeln!(w, "   traits: {}", row.traits.join(", "))?;
        }
    }
    Ok(())
}
