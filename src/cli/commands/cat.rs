//! Cat command - stream a document to stdout

use super::Browser;
use crate::cli::args::CatArgs;
use crate::config::Config;
use crate::error::{ArchiveError, ArchiveResult};
use crate::handle::CancellationToken;
use crate::id::AccessMode;
use std::io::{self, Write};

/// Execute the cat command
pub fn execute(args: CatArgs, config: &Config) -> ArchiveResult<()> {
    let browser = Browser::open(&args.archive, config)?;
    let document_id = browser.document_id(&args.path)?;

    let mut stream = browser.coordinator().open_document(
        &document_id,
        AccessMode::Read,
        &CancellationToken::new(),
    )?;

    let mut stdout = io::stdout().lock();
    io::copy(&mut stream, &mut stdout)
        .map_err(|e| ArchiveError::io(format!("writing {} to stdout", args.path), e))?;
    stdout
        .flush()
        .map_err(|e| ArchiveError::io("flushing stdout", e))?;

    Ok(())
}
