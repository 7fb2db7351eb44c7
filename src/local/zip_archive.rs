//! Read-only archive handles over ZIP files
//!
//! The central directory is indexed once at open time. Directories that only
//! exist implicitly (as a prefix of some entry name) get synthesized index
//! entries so they can be listed like real ones.

use super::{locator_path, mime_type_for};
use crate::error::{ArchiveError, ArchiveResult};
use crate::handle::{
    ArchiveHandle, ArchiveOpener, CancellationToken, Column, DocumentRow, DocumentStream,
    SizeHint, Thumbnail, DIRECTORY_MIME_TYPE,
};
use crate::id::{AccessMode, ArchiveId, ROOT_PATH};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Upper bound on the buffer reserved before reading an entry
const MAX_PREALLOC: u64 = 1 << 20;

/// Opens local ZIP files for reading
#[derive(Debug, Clone, Default)]
pub struct ZipOpener;

impl ZipOpener {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveOpener for ZipOpener {
    fn open(&self, locator: &str, mode: AccessMode) -> ArchiveResult<Box<dyn ArchiveHandle>> {
        Ok(Box::new(ZipArchiveHandle::open(locator, mode)?))
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    /// Position in the central directory, `None` for synthesized directories
    zip_index: Option<usize>,
    is_dir: bool,
    size: u64,
}

impl IndexEntry {
    fn directory() -> Self {
        Self {
            zip_index: None,
            is_dir: true,
            size: 0,
        }
    }
}

/// An opened ZIP file
pub struct ZipArchiveHandle {
    locator: String,
    archive: Mutex<ZipArchive<File>>,
    index: BTreeMap<String, IndexEntry>,
}

impl ZipArchiveHandle {
    pub fn open(locator: &str, mode: AccessMode) -> ArchiveResult<Self> {
        if mode == AccessMode::Write {
            return Err(ArchiveError::open_failed(
                locator,
                "ZIP archives can only be opened for reading",
            ));
        }

        let path = locator_path(locator);
        let file =
            File::open(&path).map_err(|e| ArchiveError::open_failed(locator, e.to_string()))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| ArchiveError::open_failed(locator, e.to_string()))?;

        let index = Self::build_index(&mut archive)
            .map_err(|e| ArchiveError::open_failed(locator, e.to_string()))?;
        debug!("Indexed {} entries in {}", index.len(), locator);

        Ok(Self {
            locator: locator.to_string(),
            archive: Mutex::new(archive),
            index,
        })
    }

    fn build_index(archive: &mut ZipArchive<File>) -> ArchiveResult<BTreeMap<String, IndexEntry>> {
        let mut index = BTreeMap::new();
        index.insert(ROOT_PATH.to_string(), IndexEntry::directory());

        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            let Some(path) = normalize_entry_name(entry.name()) else {
                warn!("Skipping unsafe archive entry name: {}", entry.name());
                continue;
            };

            let mut parent = parent_of(&path);
            while !index.contains_key(parent) {
                index.insert(parent.to_string(), IndexEntry::directory());
                parent = parent_of(parent);
            }

            index.insert(
                path,
                IndexEntry {
                    zip_index: Some(i),
                    is_dir: entry.is_dir(),
                    size: if entry.is_dir() { 0 } else { entry.size() },
                },
            );
        }

        Ok(index)
    }

    fn entry(&self, id: &ArchiveId) -> ArchiveResult<&IndexEntry> {
        self.index
            .get(id.path())
            .ok_or_else(|| ArchiveError::NotFound(id.to_document_id()))
    }

    fn row(&self, id: &ArchiveId, entry: &IndexEntry) -> DocumentRow {
        let display_name = if id.is_root() {
            locator_path(&self.locator)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.locator.clone())
        } else {
            id.path().rsplit('/').next().unwrap_or_default().to_string()
        };

        let mime_type = if entry.is_dir {
            DIRECTORY_MIME_TYPE
        } else {
            mime_type_for(&display_name)
        };

        DocumentRow {
            document_id: Some(id.to_document_id()),
            display_name: Some(display_name),
            mime_type: Some(mime_type.to_string()),
            size: Some(entry.size),
            last_modified: None,
        }
    }
}

/// Turn a ZIP entry name into a `/`-rooted path, rejecting traversal
fn normalize_entry_name(name: &str) -> Option<String> {
    let mut parts = Vec::new();
    for part in name.split(|c: char| c == '/' || c == '\\') {
        match part {
            "" | "." => continue,
            ".." => return None,
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(format!("/{}", parts.join("/")))
}

/// Read at most `declared` bytes. The declared size comes from the archive
/// itself, so only a bounded amount is reserved up front.
fn read_entry(reader: &mut impl Read, declared: u64) -> std::io::Result<Vec<u8>> {
    let reserve = usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0);
    let mut bytes = Vec::with_capacity(reserve);
    reader.take(declared).read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT_PATH,
        Some(i) => &path[..i],
    }
}

impl ArchiveHandle for ZipArchiveHandle {
    fn query_children(
        &self,
        parent: &ArchiveId,
        projection: &[Column],
    ) -> ArchiveResult<Vec<DocumentRow>> {
        let entry = self.entry(parent)?;
        if !entry.is_dir {
            return Err(ArchiveError::NotFound(format!(
                "{} is not a directory",
                parent
            )));
        }

        let mut rows = Vec::new();
        for (path, entry) in &self.index {
            if path != ROOT_PATH && parent_of(path) == parent.path() {
                let id = parent.with_path(path.clone())?;
                rows.push(self.row(&id, entry).project(projection));
            }
        }
        Ok(rows)
    }

    fn query_document(&self, id: &ArchiveId, projection: &[Column]) -> ArchiveResult<DocumentRow> {
        let entry = self.entry(id)?;
        Ok(self.row(id, entry).project(projection))
    }

    fn document_type(&self, id: &ArchiveId) -> ArchiveResult<String> {
        let entry = self.entry(id)?;
        Ok(self
            .row(id, entry)
            .mime_type
            .unwrap_or_else(|| DIRECTORY_MIME_TYPE.to_string()))
    }

    fn is_child(&self, parent: &ArchiveId, id: &ArchiveId) -> ArchiveResult<bool> {
        self.entry(id)?;
        if parent.is_root() {
            return Ok(!id.is_root());
        }
        Ok(id
            .path()
            .strip_prefix(parent.path())
            .is_some_and(|rest| rest.starts_with('/')))
    }

    fn open_document(
        &self,
        id: &ArchiveId,
        mode: AccessMode,
        cancel: &CancellationToken,
    ) -> ArchiveResult<DocumentStream> {
        if mode == AccessMode::Write {
            return Err(ArchiveError::Unsupported(format!(
                "writing {} in a read-only archive",
                id
            )));
        }

        let entry = self.entry(id)?;
        let Some(zip_index) = entry.zip_index.filter(|_| !entry.is_dir) else {
            return Err(ArchiveError::NotFound(format!("{} is a directory", id)));
        };
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        let mut archive = self.archive.lock();
        let mut file = archive.by_index(zip_index)?;
        let bytes = read_entry(&mut file, entry.size)
            .map_err(|e| ArchiveError::io(format!("reading {}", id), e))?;

        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_thumbnail(
        &self,
        id: &ArchiveId,
        _size_hint: SizeHint,
        _cancel: &CancellationToken,
    ) -> ArchiveResult<Thumbnail> {
        Err(ArchiveError::Unsupported(format!("thumbnail for {}", id)))
    }

    fn create_document(
        &self,
        parent: &ArchiveId,
        _mime_type: &str,
        display_name: &str,
    ) -> ArchiveResult<ArchiveId> {
        Err(ArchiveError::Unsupported(format!(
            "creating {} in read-only archive {}",
            display_name, parent
        )))
    }

    fn close(&self) -> ArchiveResult<()> {
        debug!("Releasing ZIP file {}", self.locator);
        Ok(())
    }
}
