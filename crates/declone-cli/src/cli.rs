use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "declone",
    about = "Promote clone variants by merging them with their sources",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a clone promotion over a fixture's manifest
    Run(RunArgs),
    /// Show the source each clone in a fixture resolves to
    Resolve(ResolveArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// JSON fixture with variants, relationships, and manifest entries
    #[arg(long)]
    pub fixture: PathBuf,
    /// TOML promoter configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Override the configured batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Manifest id to run under (random if omitted)
    #[arg(long)]
    pub manifest: Option<uuid::Uuid>,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[arg(long)]
    pub fixture: PathBuf,
}
