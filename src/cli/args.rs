//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// getpack - fetch external resources once, use them everywhere
///
/// Downloads tools and packages on first use into a shared cache that is
/// safe to use from many processes at once.
#[derive(Parser, Debug)]
#[command(name = "getpack")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GETPACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache root directory
    #[arg(long, global = true, env = "GETPACK_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Extra catalog file merged over the built-in one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Materialize resources and print their paths
    Fetch(FetchArgs),

    /// Materialize one resource and print only its path
    Path(ResourceArgs),

    /// List cached resources
    List(ListArgs),

    /// List resources declared in the catalog
    Catalog(ListArgs),

    /// Remove one resource from the cache
    Remove(ResourceArgs),

    /// Remove every cached resource
    Clean(CleanArgs),

    /// Run the executable shipped in a resource
    Run(RunArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Catalog names
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Version to use instead of the declared one
    #[arg(long)]
    pub version: Option<String>,
}

/// A single catalog resource
#[derive(Parser, Debug)]
pub struct ResourceArgs {
    /// Catalog name
    pub name: String,

    /// Version to use instead of the declared one
    #[arg(long)]
    pub version: Option<String>,
}

/// Arguments for the list and catalog commands
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Catalog name
    pub name: String,

    /// Version to use instead of the declared one
    #[arg(long)]
    pub version: Option<String>,

    /// Arguments passed to the program
    #[arg(last = true)]
    pub args: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
