use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "slugmap",
    about = "Stable identifiers for (slug, type) pairs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file; environment variables and flags override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store connection string: postgres://…, file:<path>, or memory:
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Print the identifier for a slug and type, creating it if needed
    GetId(GetIdArgs),
    /// Print the slug and type behind an identifier
    Resolve(ResolveArgs),
    /// Check that the store is reachable
    Health,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct GetIdArgs {
    pub slug: String,
    /// Entity type, e.g. manga or series
    #[arg(value_name = "TYPE")]
    pub kind: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub identifier: String,
}
