//! Stat command - show document metadata

use super::Browser;
use crate::cli::args::StatArgs;
use crate::config::Config;
use crate::error::ArchiveResult;
use crate::ui::{self, UiContext};

/// Execute the stat command
pub fn execute(args: StatArgs, config: &Config) -> ArchiveResult<()> {
    let browser = Browser::open(&args.archive, config)?;
    let document_id = browser.document_id(&args.path)?;
    let row = browser.coordinator().query_document(&document_id, None)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&row)?);
        return Ok(());
    }

    let ctx = UiContext::detect();
    let unknown = || "-".to_string();
    ui::key_value(&ctx, "Name", row.display_name.as_deref().unwrap_or("-"));
    ui::key_value(&ctx, "Id", row.document_id.as_deref().unwrap_or("-"));
    ui::key_value(&ctx, "Type", row.mime_type.as_deref().unwrap_or("-"));
    ui::key_value(&ctx, "Size", &row.size.map(|s| s.to_string()).unwrap_or_else(unknown));
    ui::key_value(
        &ctx,
        "Modified",
        &row.last_modified.map(|t| t.to_string()).unwrap_or_else(unknown),
    );

    Ok(())
}
