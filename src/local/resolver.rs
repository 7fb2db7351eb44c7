//! Container metadata for files on disk

use super::{locator_path, mime_type_for};
use crate::error::{ArchiveError, ArchiveResult};
use crate::handle::{ChangeListener, ContainerResolver, Subscription, DIRECTORY_MIME_TYPE};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Resolves local files. Files have no notification address, so change
/// listeners are never registered.
#[derive(Debug, Clone, Default)]
pub struct LocalResolver;

impl LocalResolver {
    pub fn new() -> Self {
        Self
    }

    /// Detect ZIP containers by magic bytes (most reliable)
    fn detect_by_magic(path: &Path) -> Option<&'static str> {
        let mut magic = [0u8; 4];
        let mut file = File::open(path).ok()?;
        let read = file.read(&mut magic).ok()?;

        match &magic[..read] {
            // PK\x03\x04, PK\x05\x06 (empty archive), PK\x07\x08 (spanned)
            [0x50, 0x4B, 0x03, 0x04] | [0x50, 0x4B, 0x05, 0x06] | [0x50, 0x4B, 0x07, 0x08] => {
                Some("application/zip")
            }
            _ => None,
        }
    }
}

impl ContainerResolver for LocalResolver {
    fn query_mime_type(&self, locator: &str) -> ArchiveResult<String> {
        let path = locator_path(locator);
        let metadata = std::fs::metadata(&path)
            .map_err(|_| ArchiveError::NotFound(format!("File not found: {}", locator)))?;

        if metadata.is_dir() {
            return Ok(DIRECTORY_MIME_TYPE.to_string());
        }

        // Fallback to extension-based detection
        let mime_type = Self::detect_by_magic(&path)
            .unwrap_or_else(|| mime_type_for(&path.to_string_lossy()));
        debug!("Detected {} for {}", mime_type, locator);
        Ok(mime_type.to_string())
    }

    fn query_display_name(&self, locator: &str) -> ArchiveResult<String> {
        let path = locator_path(locator);
        if !path.exists() {
            return Err(ArchiveError::NotFound(format!("File not found: {}", locator)));
        }

        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ArchiveError::NotFound(format!("No file name in {}", locator)))
    }

    fn register_change_listener(
        &self,
        _locator: &str,
        _listener: ChangeListener,
    ) -> Option<Subscription> {
        None
    }
}
