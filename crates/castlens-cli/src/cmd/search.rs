//! `castlens search`: filtered, ranked, paginated search with facets.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use castlens_core::error::ErrorCode;
use castlens_search::facets::Facets;
use castlens_search::{SearchFilters, SortOrder, TimeBucket, TimePattern, search};

use super::ItemRow;
use crate::context::Context;
use crate::output::{CliError, fail, pretty_kv, pretty_section, render_mode, snippet};

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Case-insensitive substring matched against item and quoted text.
    pub query: Option<String>,

    /// Only quotes (`true`) or only non-quotes (`false`).
    #[arg(long, value_name = "BOOL")]
    pub is_quote: Option<bool>,

    /// Only items with (or without) an image embed.
    #[arg(long, value_name = "BOOL")]
    pub has_image: Option<bool>,

    /// Only items with (or without) a non-image link.
    #[arg(long, value_name = "BOOL")]
    pub has_link: Option<bool>,

    /// Inclusive lower time bound (ISO-8601 date or timestamp).
    #[arg(long = "from", value_name = "DATE")]
    pub date_from: Option<String>,

    /// Inclusive upper time bound (ISO-8601 date or timestamp).
    #[arg(long = "to", value_name = "DATE")]
    pub date_to: Option<String>,

    /// Require any of these emoji in the item's own text. Repeatable.
    #[arg(long = "emoji", value_name = "EMOJI")]
    pub emojis: Vec<String>,

    /// Only single-word items.
    #[arg(long)]
    pub one_word: bool,

    /// Only items of 240 characters or more.
    #[arg(long)]
    pub longform: bool,

    #[arg(long, value_name = "N")]
    pub min_likes: Option<u64>,

    #[arg(long, value_name = "N")]
    pub min_replies: Option<u64>,

    /// Sort order: newest, likes, replies.
    #[arg(long, value_name = "ORDER")]
    pub sort: Option<String>,

    /// Hour bucket: midnight, morning, lunch.
    #[arg(long, value_name = "BUCKET")]
    pub bucket: Option<String>,

    /// Minute pattern: topOfHour, buzzerBeater, elevenEleven, duplicities.
    #[arg(long, value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Require this enabled trait. Repeatable; all must match.
    #[arg(long = "trait", value_name = "NAME")]
    pub traits: Vec<String>,

    /// Results to skip. Negative values count as zero.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub offset: i64,

    /// Page size (defaults to `[search] default_limit`).
    #[arg(short = 'n', long, allow_negative_numbers = true, conflicts_with = "all")]
    pub limit: Option<i64>,

    /// Return every result after the offset.
    #[arg(long)]
    pub all: bool,
}

impl SearchArgs {
    /// Build search filters, parsing the enum-valued flags.
    pub fn to_filters(&self, default_limit: usize) -> Result<SearchFilters> {
        let limit = if self.all {
            None
        } else {
            Some(
                self.limit
                    .unwrap_or_else(|| i64::try_from(default_limit).unwrap_or(i64::MAX)),
            )
        };
        Ok(SearchFilters {
            query: self.query.clone(),
            offset: self.offset,
            limit,
            is_quote: self.is_quote,
            has_image: self.has_image,
            has_link: self.has_link,
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            emojis: self.emojis.clone(),
            one_word: self.one_word,
            longform: self.longform,
            min_likes: self.min_likes,
            min_replies: self.min_replies,
            sort_by: self.sort.as_deref().map(str::parse::<SortOrder>).transpose()?.unwrap_or_default(),
            time_bucket: self.bucket.as_deref().map(str::parse::<TimeBucket>).transpose()?,
            time_pattern: self.pattern.as_deref().map(str::parse::<TimePattern>).transpose()?,
            traits: self.traits.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SuggestionRow<'a> {
    score: f64,
    #[serde(flatten)]
    row: ItemRow<'a>,
}

#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    total: usize,
    offset: usize,
    count: usize,
    results: Vec<ItemRow<'a>>,
    facets: Facets,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<SuggestionRow<'a>>,
}

/// Execute `castlens search`.
pub fn run_search(args: &SearchArgs, ctx: &Context) -> Result<()> {
    let filters = args
        .to_filters(ctx.config.project.search.default_limit)
        .map_err(|e| fail(ctx.output, &CliError::from_code(ErrorCode::InvalidFilterValue, format!("{e:#}"))))?;
    let (session, _store) = ctx.open_session()?;

    let response = search(session.items(), &filters, session.index(), session.registry(), ctx.tz);
    let (offset, _) = filters.page_bounds(response.total);

    let payload = SearchOutput {
        query: filters.trimmed_query(),
        total: response.total,
        offset,
        count: response.results.len(),
        results: response
            .results
            .iter()
            .map(|item| ItemRow::new(item, &session))
            .collect(),
        facets: response.facets,
        suggestions: response
            .suggestions
            .iter()
            .map(|s| SuggestionRow {
                score: s.score,
                row: ItemRow::new(s.item, &session),
            })
            .collect(),
    };

    render_mode(ctx.output, &payload, render_search_text, render_search_pretty)
}

fn render_search_text(out: &SearchOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    for row in &out.results {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.key,
            row.timestamp(),
            row.item.likes(),
            row.item.reply_count(),
            row.traits.join(","),
            snippet(row.item.text_or_empty(), 120)
        )?;
    }
    for s in &out.suggestions {
        writeln!(
            w,
            "suggestion\t{}\t{:.3}\t{}",
            s.row.key,
            s.score,
            snippet(s.row.item.text_or_empty(), 120)
        )?;
    }
    Ok(())
}

fn render_search_pretty(out: &SearchOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    let heading = match out.query {
        Some(q) => format!("Results for '{q}'"),
        None => "Results".to_string(),
    };
    pretty_section(w, &heading)?;
    if out.results.is_empty() {
        writeln!(w, "No items matched.")?;
    }
    for row in &out.results {
        writeln!(
            w,
            "{}  @{}  {}  ♥ {}  ↩ {}",
            row.key,
            row.author(),
            row.timestamp(),
            row.item.likes(),
            row.item.reply_count()
        )?;
        writeln!(w, "    {}", snippet(row.item.text_or_empty(), 100))?;
        if !row.traits.is_empty() {
            writeln!(w, "    traits: {}", row.traits.join(", "))?;
        }
    }
    writeln!(w)?;
    pretty_kv(
        w,
        "Showing",
        format!("{}..{} of {}", out.offset, out.offset + out.count, out.total),
    )?;
    pretty_kv(
        w,
        "Facets",
        format!(
            "{} quotes, {} images, {} links",
            out.facets.counts.quotes, out.facets.counts.images, out.facets.counts.links
        ),
    )?;
    if !out.facets.top_emojis.is_empty() {
        let emojis: Vec<String> = out
            .facets
            .top_emojis
            .iter()
            .map(|e| format!("{} {}", e.emoji, e.count))
            .collect();
        pretty_kv(w, "Top emoji", emojis.join("  "))?;
    }

    if !out.suggestions.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Did you mean")?;
        for s in &out.suggestions {
            writeln!(
                w,
                "{:.2}  {}  {}",
                s.score,
                s.row.key,
                snippet(s.row.item.text_or_empty(), 80)
            )?;
        }
    }
    Ok(())
}
