//! Archivist - browse ZIP archives as document trees
//!
//! CLI entry point that dispatches to subcommands.

use archivist::cli::{Cli, Commands};
use archivist::config::{Config, ConfigManager};
use archivist::error::ArchiveResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> ArchiveResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load()?;

    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Ls(args) => archivist::cli::commands::ls(args, &config),
        Commands::Stat(args) => archivist::cli::commands::stat(args, &config),
        Commands::Cat(args) => archivist::cli::commands::cat(args, &config),
        Commands::Config(args) => archivist::cli::commands::config(args, &config_manager, &config),
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let verbose = if config.general.verbose { verbose.max(1) } else { verbose };
    let filter = match verbose {
        0 => EnvFilter::new("archivist=warn"),
        1 => EnvFilter::new("archivist=info"),
        _ => EnvFilter::new("archivist=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
