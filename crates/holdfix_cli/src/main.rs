//! Holdfix command-line interface: batch wirelength reports and hold repair over routed designs.
//!
//! Provides `holdfix report` for measuring a routed snapshot and ranking its
//! setup and hold risks, and `holdfix fix` for repairing hold-risk
//! connections and writing the updated snapshot.

#![warn(missing_docs)]

mod fix;
mod pipeline;
mod report;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Holdfix, post-route hold-time repair.
#[derive(Parser, Debug)]
#[command(name = "holdfix", version, about = "Post-route hold-time repair")]
pub struct Cli {
    /// Print errors only.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log each repair round at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// When to color diagnostics and logs.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `holdfix.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Measure a routed snapshot and report setup and hold rankings.
    Report(ReportArgs),
    /// Repair hold-risk connections and write the updated snapshot.
    Fix(FixArgs),
}

/// Arguments for the `holdfix report` subcommand.
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Snapshot file (JSON with `device` and `design`).
    pub snapshot: String,

    /// Output format for the report and diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `holdfix fix` subcommand.
#[derive(Parser, Debug)]
pub struct FixArgs {
    /// Snapshot file to repair.
    pub snapshot: String,

    /// Where to write the repaired snapshot.
    pub output: String,

    /// Output format for the reports and diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Node expansions per sink before the maze router gives up.
    #[arg(long)]
    pub expansion_limit: Option<usize>,
}

/// Color selection for `--color`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal.
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

/// Report and diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Plain text on the terminal.
    Text,
    /// One JSON document on stdout.
    Json,
}

/// Settings shared by every subcommand.
pub struct GlobalArgs {
    /// Print errors only.
    pub quiet: bool,
    /// Debug-level logging.
    pub verbose: bool,
    /// Resolved color choice.
    pub color: bool,
    /// Explicit `holdfix.toml` path.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Report(ref args) => report::run(args, &global),
        Command::Fix(ref args) => fix::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Default log filter for the given verbosity flags.
fn default_filter(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "holdfix_route=debug,holdfix_cli=debug"
    } else {
        "warn"
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the flags.
fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(global)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .try_init();
}

/// Diagnostics and logs go to stderr, so color follows it.
fn atty_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}
