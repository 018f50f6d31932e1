use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod agents;
mod catalog;
mod cli;
mod config;
mod download;
mod error;
mod ui;
mod version;

mod auth;
mod client;
mod store;

#[cfg(test)]
mod tests;

use catalog::SortKey;
use cli::CliHandler;
use version::CURRENT_VERSION;

#[derive(Parser)]
#[command(
    name = "ahub",
    about = "AgentHub marketplace client",
    long_about = "AgentHub - Browse, search, and download agent packages

OVERVIEW:
  This tool lets you explore the AgentHub marketplace from the terminal and
  fetch agent packages to run locally.

QUICK START:
  ahub browse                           # List the full catalog
  ahub browse --category productivity   # Filter by category
  ahub search \"mail triage\"             # Free-text search
  ahub show 42                          # Agent details
  ahub download 42                      # Fetch the package
  ahub login                            # Authenticate with your API key
  ahub status                           # Check authentication and server status",
    version = CURRENT_VERSION,
    author = "AgentHub Team",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the agent catalog
    #[command(aliases = &["ls"])]
    Browse(BrowseArgs),

    /// Search agents by name or description
    Search(SearchArgs),

    /// Show details for one agent
    Show(ShowArgs),

    /// Download an agent package
    #[command(aliases = &["dl"])]
    Download(DownloadArgs),

    /// Show authentication status
    #[command(aliases = &["st"])]
    Status,

    /// Configure settings
    #[command(aliases = &["cfg"])]
    Config(ConfigArgs),

    /// Login with API key
    Login(LoginArgs),

    /// Logout
    Logout,
}

#[derive(Args)]
pub struct BrowseArgs {
    /// Restrict the listing to one category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Sort order for the listing
    #[arg(short, long, value_enum, default_value = "date")]
    pub sort: SortKey,

    /// Only show agents you published (requires login)
    #[arg(long)]
    pub mine: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    pub term: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: i64,
}

#[derive(Args)]
pub struct DownloadArgs {
    pub id: i64,

    /// Destination path (defaults to the configured download directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    #[cfg(debug_assertions)]
    SetEndpoint {
        url: String,
    },
    SetTimeout {
        seconds: u64,
    },
    SetVerbose {
        enabled: String,
    },
    SetDownloadDir {
        path: PathBuf,
    },
    Reset,
}

#[derive(Args)]
pub struct LoginArgs {
    /// API key; prompted for interactively when omitted
    pub api_key: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt().with_env_filter(format!("ahub={}", log_level));
    subscriber.init();

    let mut handler = CliHandler::with_config_path(None);

    if let Err(e) = handler.execute(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
