//! docqa: data-quality checks over document collections.
//!
//! Loads a TOML rule file, checks every configured collection of a
//! JSON-lines data directory in order, prints a summary and optionally
//! writes the full report as JSON.
//!
//! Usage:
//!   docqa run --config rules.toml --data ./data --report report.json
//!   docqa check-config --config rules.toml
//!
//! Exit status:
//!   0  run completed
//!   1  the rule file could not be loaded, a collection was missing or
//!      unreachable, or the report could not be published
//!   2  `--fail-on-violations` was given and violations or invalid rule
//!      sets were found

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Declarative data-quality checks for document collections.
#[derive(Parser)]
#[command(
    name = "docqa",
    version,
    about = "Declarative data-quality checks for document collections",
    long_about = "Checks document collections against a TOML rule file: required fields,\n\
                  data types, categorical values, numeric ranges and mandatory markers."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check every configured collection and report the results.
    Run(RunArgs),
    /// Load the rule file and compile every collection's rules without
    /// touching any data.
    CheckConfig {
        /// Path to the TOML rule file.
        #[arg(long, short)]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the TOML rule file.
    #[arg(long, short)]
    pub config: PathBuf,

    /// Directory of `<collection>.jsonl` files. Overrides `[source] directory`.
    #[arg(long, short)]
    pub data: Option<PathBuf>,

    /// Write the full run report as JSON to this file.
    #[arg(long, short)]
    pub report: Option<PathBuf>,

    /// Worker threads per collection (1 evaluates inline).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Documents per batch read from the source.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Failure samples kept per rule.
    #[arg(long)]
    pub sample_capacity: Option<usize>,

    /// Exit with status 2 when any violation or invalid rule set is found.
    #[arg(long)]
    pub fail_on_violations: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Set RUST_LOG=info (or debug) for progress output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let status = match cli.command {
        Command::Run(args) => commands::run(&args),
        Command::CheckConfig { config } => commands::check_config(&config),
    };
    ExitCode::from(status)
}
