//! Kiln CLI — inspects and publishes the incremental build cache.
//!
//! Provides `kiln status` for reporting what the latest build changed,
//! `kiln export` for minimal-diff publication to a directory, and `kiln gc`
//! for removing body files no generation references anymore.

#![warn(missing_docs)]

mod export;
mod gc;
mod project;
mod status;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Kiln — incremental static-site builds.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln build cache tools")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory containing `kiln.toml`.
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Cache directory, overriding `cache.dir` from `kiln.toml`.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report what the latest build added, evicted, and kept.
    Status(StatusArgs),
    /// Publish the latest build to an output directory.
    Export(ExportArgs),
    /// Remove body files that no generation references.
    Gc,
}

/// Arguments for the `kiln status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln export` subcommand.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Output directory, overriding `export.out_dir` from `kiln.toml`.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Rewrite every current route instead of only the added ones.
    #[arg(long)]
    pub full: bool,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Project directory.
    pub project: PathBuf,
    /// Cache directory override.
    pub cache_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        project: cli.project,
        cache_dir: cli.cache_dir,
    };

    let result = match cli.command {
        Command::Status(ref args) => status::run(args, &global),
        Command::Export(ref args) => export::run(args, &global),
        Command::Gc => gc::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the tracing subscriber. `KILN_LOG` overrides the level chosen by flags.
fn init_logging(quiet: bool, verbose: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("KILN_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
