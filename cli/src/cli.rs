use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "scribe", author, version, about = "Harvest meeting transcripts into local files")]
pub struct Cli {
    /// Verbose logging (RUST_LOG still wins).
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in, discover items, and harvest them one at a time.
    Run(RunArgs),
    /// Harvest every pending ledger item with concurrent browser sessions.
    Parallel(ParallelArgs),
    /// Print ledger statistics.
    Status,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Delete the ledger and saved session before running.
    #[arg(long)]
    pub reset: bool,

    /// Only check the most recent items.
    #[arg(long)]
    pub quick: bool,

    /// Process only the first N discovered items.
    #[arg(long, value_name = "N")]
    pub num: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ParallelArgs {
    /// Concurrent browser sessions (defaults to `download.workers`).
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,
}
