//! Coordinator wiring shared by the archive commands

use crate::config::Config;
use crate::coordinator::{ArchivesCoordinator, Listing};
use crate::error::{ArchiveError, ArchiveResult};
use crate::id::{AccessMode, ArchiveId, ROOT_PATH};
use crate::local::{LocalResolver, ZipOpener};
use crate::ui::{TaskSpinner, UiContext};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One archive on disk, opened read-only through the coordinator
pub struct Browser {
    coordinator: ArchivesCoordinator,
    refreshed: Receiver<ArchiveId>,
    root: ArchiveId,
    load_timeout: Duration,
}

impl Browser {
    pub fn open(archive: &Path, config: &Config) -> ArchiveResult<Self> {
        let path = archive
            .canonicalize()
            .map_err(|_| ArchiveError::NotFound(archive.display().to_string()))?;
        let root = ArchiveId::root(path.display().to_string(), AccessMode::Read)?;

        let (tx, refreshed) = mpsc::channel();
        let mut options = config.coordinator_options();
        options.refresh = Some(Arc::new(move |id: &ArchiveId| {
            // The receiver is gone once the command has finished
            let _ = tx.send(id.clone());
        }));

        let coordinator = ArchivesCoordinator::with_options(
            Arc::new(ZipOpener::new()),
            Arc::new(LocalResolver::new()),
            options,
        );

        Ok(Self {
            coordinator,
            refreshed,
            root,
            load_timeout: Duration::from_secs(config.listing.load_timeout_secs),
        })
    }

    pub fn coordinator(&self) -> &ArchivesCoordinator {
        &self.coordinator
    }

    pub fn locator(&self) -> &str {
        self.root.locator()
    }

    /// Document id for a path typed by the user (`docs/a.txt`, `/docs/`, ...)
    pub fn document_id(&self, path: &str) -> ArchiveResult<String> {
        let trimmed = path.trim_matches('/');
        let path = if trimmed.is_empty() {
            ROOT_PATH.to_string()
        } else {
            format!("/{trimmed}")
        };
        Ok(self.root.with_path(path)?.to_document_id())
    }

    /// List a directory, waiting for the archive to finish opening.
    ///
    /// A listing that still reports loading after the refresh arrives is
    /// returned as is.
    pub fn list(&self, path: &str, ctx: &UiContext) -> ArchiveResult<Listing> {
        let document_id = self.document_id(path)?;
        let listing = self.coordinator.query_children(&document_id, None)?;
        if !listing.is_loading() {
            return Ok(listing);
        }

        let mut spinner = TaskSpinner::new(ctx);
        spinner.start(&format!("Opening {}...", self.locator()));

        if let Err(e) = self.wait_for_refresh() {
            spinner.stop_error("Archive did not open in time");
            return Err(e);
        }

        let listing = self.coordinator.query_children(&document_id, None)?;
        match listing.error() {
            Some(message) => spinner.stop_error(message),
            None => spinner.stop(&format!("Opened {}", self.locator())),
        }
        Ok(listing)
    }

    fn wait_for_refresh(&self) -> ArchiveResult<()> {
        loop {
            match self.refreshed.recv_timeout(self.load_timeout) {
                Ok(id) if id == self.root => {
                    debug!("Archive {} settled", id);
                    return Ok(());
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return Err(ArchiveError::LoadTimeout {
                        locator: self.locator().to_string(),
                        secs: self.load_timeout.as_secs(),
                    });
                }
            }
        }
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.coordinator.close_all();
    }
}
