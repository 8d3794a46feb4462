//! `castlens traits`: manage and dry-run trait rules.
//!
//! Every mutation goes through [`Session::apply`], which persists the
//! registry and the updated index.

use std::io::{self, Write};

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use castlens_core::cache::FileStore;
use castlens_core::error::ErrorCode;
use castlens_core::index::TraitIndex;
use castlens_core::model::ContentItem;
use castlens_core::predicate::PredicateCompiler;
use castlens_core::sanitize::sanitize;
use castlens_core::session::{IndexSource, Session, SessionEvent};
use castlens_core::traits::TraitDefinition;

use crate::context::Context;
use crate::output::{CliError, OutputMode, fail, pretty_kv, pretty_section, render, render_mode, snippet};

/// Sample keys shown by `traits check` by default.
const CHECK_SAMPLE: usize = 5;

#[derive(Subcommand, Debug)]
pub enum TraitsCommand {
    /// List every trait with its match count.
    List,
    /// Add a trait rule.
    Add(AddArgs),
    /// Replace a trait's code (and optionally its description).
    Edit(EditArgs),
    /// Enable a trait.
    Enable(NameArg),
    /// Disable a trait. Its index entries are kept.
    Disable(NameArg),
    /// Delete a trait.
    Rm(NameArg),
    /// Compile a rule and count matches without saving anything.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct NameArg {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub name: String,

    /// Predicate source, e.g. `c => c.text.includes('gm')`.
    #[arg(long)]
    pub code: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Save even if the code does not compile (it then matches nothing).
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub name: String,

    #[arg(long)]
    pub code: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Save even if the code does not compile.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub code: String,

    /// Matching item keys to show.
    #[arg(long, default_value_t = CHECK_SAMPLE)]
    pub limit: usize,
}

/// Execute `castlens traits <command>`.
pub fn run_traits(command: &TraitsCommand, ctx: &Context) -> Result<()> {
    match command {
        TraitsCommand::List => run_list(ctx),
        TraitsCommand::Add(args) => {
            let (mut session, mut store) = ctx.open_session()?;
            ensure_compiles(&mut session, &args.code, args.force, ctx.output)?;
            let event = SessionEvent::TraitAdded {
                name: args.name.clone(),
                definition: TraitDefinition::new(args.description.clone(), args.code.clone(), Utc::now()),
            };
            mutate(&mut session, &mut store, event, "added", &args.name, ctx)
        }
        TraitsCommand::Edit(args) => {
            let (mut session, mut store) = ctx.open_session()?;
            ensure_compiles(&mut session, &args.code, args.force, ctx.output)?;
            let event = SessionEvent::TraitEdited {
                name: args.name.clone(),
                description: args.description.clone(),
                code: args.code.clone(),
            };
            mutate(&mut session, &mut store, event, "edited", &args.name, ctx)
        }
        TraitsCommand::Enable(NameArg { name }) | TraitsCommand::Disable(NameArg { name }) => {
            let enabled = matches!(command, TraitsCommand::Enable(_));
            let (mut session, mut store) = ctx.open_session()?;
            let event = SessionEvent::TraitToggled {
                name: name.clone(),
                enabled,
            };
            mutate(
                &mut session,
                &mut store,
                event,
                if enabled { "enabled" } else { "disabled" },
                name,
                ctx,
            )
        }
        TraitsCommand::Rm(NameArg { name }) => {
            let (mut session, mut store) = ctx.open_session()?;
            let event = SessionEvent::TraitDeleted { name: name.clone() };
            mutate(&mut session, &mut store, event, "deleted", name, ctx)
        }
        TraitsCommand::Check(args) => run_check(args, ctx),
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TraitRow<'a> {
    name: &'a str,
    enabled: bool,
    description: &'a str,
    code: &'a str,
    created_at: DateTime<Utc>,
    matches: usize,
    /// Present when the code does not compile.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn match_count(index: &TraitIndex, name: &str) -> usize {
    index.iter().filter(|(_, names)| names.contains(name)).count()
}

fn run_list(ctx: &Context) -> Result<()> {
    let (mut session, _store) = ctx.open_session()?;
    let codes: Vec<String> = session.registry().iter().map(|(_, def)| def.code.clone()).collect();
    let mut errors = Vec::with_capacity(codes.len());
    for code in &codes {
        errors.push(session.compile(code).compile_error().map(ToString::to_string));
    }

    let rows: Vec<TraitRow<'_>> = session
        .registry()
        .iter()
        .zip(errors)
        .map(|((name, def), error)| TraitRow {
            name,
            enabled: def.enabled,
            description: &def.description,
            code: &def.code,
            created_at: def.created_at,
            matches: match_count(session.index(), name),
            error,
        })
        .collect();

    render_mode(
        ctx.output,
        &rows,
        |rows, w| render_list_text(rows, w),
        |rows, w| render_list_pretty(rows, w),
    )
}

fn render_list_text(rows: &[TraitRow<'_>], w: &mut dyn Write) -> io::Result<()> {
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            row.name,
            if row.enabled { "on" } else { "off" },
            row.matches,
            row.description
        )?;
    }
    Ok(())
}

fn render_list_pretty(rows: &[TraitRow<'_>], w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Traits")?;
    if rows.is_empty() {
        return writeln!(w, "No traits defined. Add one with `castlens traits add`.");
    }
    for row in rows {
        let mark = if row.enabled { "●" } else { "○" };
        writeln!(w, "{mark} {:<28} {:>6}  {}", row.name, row.matches, row.description)?;
        writeln!(w, "    {}", snippet(row.code, 90))?;
        if let Some(error) = &row.error {
            writeln!(w, "    compile error: {error}")?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// mutations
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MutationOutput<'a> {
    action: &'static str,
    name: &'a str,
    enabled: Option<bool>,
    matches: usize,
    saved: bool,
}

fn ensure_compiles(session: &mut Session, code: &str, force: bool, output: OutputMode) -> Result<()> {
    let predicate = session.compile(code);
    match predicate.compile_error() {
        Some(err) if !force => Err(fail(
            output,
            &CliError::from_code(ErrorCode::PredicateCompileFailed, format!("trait code does not compile: {err}")),
        )),
        Some(err) => {
            tracing::warn!(error = %err, "saving trait whose code does not compile");
            Ok(())
        }
        None => Ok(()),
    }
}

fn mutate(
    session: &mut Session,
    store: &mut FileStore,
    event: SessionEvent,
    action: &'static str,
    name: &str,
    ctx: &Context,
) -> Result<()> {
    session
        .apply(event, store)
        .map_err(|e| fail(ctx.output, &CliError::from_code(e.code(), e.to_string())))?;
    tracing::info!(trait_name = name, action, "trait registry updated");

    let payload = MutationOutput {
        action,
        name,
        enabled: session.registry().get(name).map(|def| def.enabled),
        matches: match_count(session.index(), name),
        saved: session.index_source() != IndexSource::RebuiltUnsaved,
    };
    render(ctx.output, &payload, |p, w| {
        writeln!(w, "{} trait '{}' ({} matching items)", p.action, p.name, p.matches)?;
        if !p.saved {
            writeln!(w, "warning: changes could not be persisted")?;
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CheckOutput {
    matched: usize,
    total: usize,
    sample: Vec<String>,
}

fn run_check(args: &CheckArgs, ctx: &Context) -> Result<()> {
    let mut compiler = PredicateCompiler::new(ctx.tz);
    let predicate = compiler.compile(&args.code);
    if let Some(err) = predicate.compile_error() {
        return Err(fail(
            ctx.output,
            &CliError::from_code(ErrorCode::PredicateCompileFailed, err.to_string()),
        ));
    }

    let items = ctx.load_items()?;
    let matching: Vec<String> = items
        .iter()
        .filter(|item| predicate.matches_item(&sanitize(item)))
        .map(ContentItem::stable_key)
        .collect();

    let payload = CheckOutput {
        matched: matching.len(),
        total: items.len(),
        sample: matching.into_iter().take(args.limit).collect(),
    };
    render_mode(
        ctx.output,
        &payload,
        |p, w| {
            writeln!(w, "matched\t{}\t{}", p.matched, p.total)?;
            for key in &p.sample {
                writeln!(w, "{key}")?;
            }
            Ok(())
        },
        |p, w| {
            pretty_section(w, "Trait check")?;
            pretty_kv(w, "Matches", format!("{} of {}", p.matched, p.total))?;
            if !p.sample.is_empty() {
                pretty_kv(w, "Examples", p.sample.join(", "))?;
            }
            Ok(())
        },
    )
}
