#![forbid(unsafe_code)]

mod cmd;
mod context;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use context::{Context, GlobalFlags};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "castlens: trait rules, faceted search, and sampling over a post corpus",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Dataset file (overrides `[dataset] path` in config).
    #[arg(long, global = true, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Store directory for traits and the trait index.
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            data: self.data.clone(),
            store: self.store.clone(),
            format: self.format,
            json: self.json,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Search items with filters and facets",
        long_about = "Filter, rank, and page through items. Facets cover the whole filtered set; \
                      suggestions appear when a query matches nothing.",
        after_help = "EXAMPLES:\n    # Substring search, most liked first\n    castlens search gm --sort likes\n\n    \
                      # Quotes with images posted in the morning\n    castlens search --is-quote true --has-image true --bucket morning\n\n    \
                      # Items carrying a trait\n    castlens search --trait Questioner --format json"
    )]
    Search(cmd::search::SearchArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show trait statistics",
        long_about = "Per-trait item counts, percentages, and the traits-per-item distribution.",
        after_help = "EXAMPLES:\n    # Dashboard\n    castlens stats\n\n    # Machine-readable output\n    castlens stats --format json"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Draw a weighted random sample",
        long_about = "Draw three distinct items, biased toward engagement and enabled traits.",
        after_help = "EXAMPLES:\n    # Random draw\n    castlens sample\n\n    # Reproducible draw\n    castlens sample --seed 42"
    )]
    Sample(cmd::sample::SampleArgs),

    #[command(
        next_help_heading = "Traits",
        about = "Manage trait rules",
        after_help = "EXAMPLES:\n    # List traits with match counts\n    castlens traits list\n\n    \
                      # Add a rule\n    castlens traits add gm --code \"c => c.text == 'gm'\"\n\n    \
                      # Try a rule without saving it\n    castlens traits check \"c => len(words(c.text)) > 50\""
    )]
    Traits {
        #[command(subcommand)]
        command: cmd::traits::TraitsCommand,
    },

    #[command(
        next_help_heading = "Maintenance",
        about = "Inspect or rebuild the trait index",
        after_help = "EXAMPLES:\n    # Is the cached index usable?\n    castlens index status\n\n    # Recompute every trait\n    castlens index rebuild"
    )]
    Index {
        #[command(subcommand)]
        command: cmd::index::IndexCommand,
    },

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    castlens completions bash > ~/.local/share/bash-completion/completions/castlens"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CASTLENS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "castlens=debug,info"
        } else {
            "castlens=info,warn"
        })
    });

    let format = env::var("CASTLENS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let project_root = env::current_dir()?;
    let ctx = Context::resolve(&project_root, &cli.global_flags())?;

    match cli.command {
        Commands::Search(ref args) => cmd::search::run_search(args, &ctx),
        Commands::Stats(ref args) => cmd::stats::run_stats(args, &ctx),
        Commands::Sample(ref args) => cmd::sample::run_sample(args, &ctx),
        Commands::Traits { ref command } => cmd::traits::run_traits(command, &ctx),
        Commands::Index { ref command } => cmd::index::run_index(command, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}
