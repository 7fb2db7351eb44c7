//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Archivist - browse ZIP archives as document trees
///
/// Keeps a small cache of open archives and serves listings, metadata and
/// file contents from them.
#[derive(Parser, Debug)]
#[command(name = "archivist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ARCHIVIST_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a directory inside an archive
    Ls(LsArgs),

    /// Show metadata of a document inside an archive
    Stat(StatArgs),

    /// Write a document's contents to stdout
    Cat(CatArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the ls command
#[derive(Parser, Debug)]
pub struct LsArgs {
    /// Archive file
    pub archive: PathBuf,

    /// Directory inside the archive
    #[arg(default_value = "/")]
    pub path: String,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the stat command
#[derive(Parser, Debug)]
pub struct StatArgs {
    /// Archive file
    pub archive: PathBuf,

    /// Document inside the archive
    #[arg(default_value = "/")]
    pub path: String,

    /// Print JSON instead of key-value lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the cat command
#[derive(Parser, Debug)]
pub struct CatArgs {
    /// Archive file
    pub archive: PathBuf,

    /// Document inside the archive
    pub path: String,
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

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
