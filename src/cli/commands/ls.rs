//! Ls command - list a directory inside an archive

use super::Browser;
use crate::cli::args::{LsArgs, OutputFormat};
use crate::config::Config;
use crate::error::{ArchiveError, ArchiveResult};
use crate::handle::DocumentRow;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the ls command
pub fn execute(args: LsArgs, config: &Config) -> ArchiveResult<()> {
    let ctx = UiContext::detect();
    let browser = Browser::open(&args.archive, config)?;
    let listing = browser.list(&args.path, &ctx)?;

    if let Some(message) = listing.error() {
        return Err(ArchiveError::open_failed(browser.locator(), message));
    }

    match args.format {
        OutputFormat::Json => print_json(&listing.rows)?,
        OutputFormat::Plain => print_plain(&listing.rows),
        OutputFormat::Table if listing.rows.is_empty() => ui::step_info(&ctx, "Empty directory"),
        OutputFormat::Table => print_table(&ctx, &args.path, &listing.rows),
    }

    Ok(())
}

fn print_table(ctx: &UiContext, path: &str, rows: &[DocumentRow]) {
    ui::intro(ctx, path);

    println!(
        "{:<32} {:<24} {:>10}",
        style("NAME").bold(),
        style("TYPE").bold(),
        style("SIZE").bold()
    );
    println!("{}", "-".repeat(68));

    for row in rows {
        let name = row.display_name.as_deref().unwrap_or("?");
        let name = if row.is_directory() {
            style(format!("{name}/")).cyan()
        } else {
            style(name.to_string())
        };
        let size = if row.is_directory() {
            "-".to_string()
        } else {
            row.size.map(|s| s.to_string()).unwrap_or_default()
        };

        println!(
            "{:<32} {:<24} {:>10}",
            name,
            row.mime_type.as_deref().unwrap_or(""),
            size
        );
    }

    println!();
    println!("{} item(s)", rows.len());
}

fn print_json(rows: &[DocumentRow]) -> ArchiveResult<()> {
    let json = serde_json::to_string_pretty(rows)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(rows: &[DocumentRow]) {
    for row in rows {
        let name = row.display_name.as_deref().unwrap_or_default();
        if row.is_directory() {
            println!("{name}/");
        } else {
            println!("{name}");
        }
    }
}
