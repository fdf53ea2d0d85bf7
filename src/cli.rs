use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pkgscore",
    version,
    about = "Score GitHub and npm packages on maintainer health metrics"
)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score every package URL listed in FILE (one per line)
    Score(ScoreCommand),
    /// Print the owner/repo a single package URL resolves to
    Resolve(ResolveCommand),
}

#[derive(Args)]
pub struct ScoreCommand {
    pub file: PathBuf,
    /// Config file (defaults to ./pkgscore.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Persist the package_scores table to this SQLite file
    #[arg(long)]
    pub database: Option<PathBuf>,
    /// Number of packages processed concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct ResolveCommand {
    pub url: String,
    #[arg(long)]
    pub config: Option<PathBuf>,
}
