//! Collaborator interfaces consumed by the archive cache
//!
//! The cache never decodes archives itself. An [`ArchiveOpener`] turns a
//! container locator into an [`ArchiveHandle`], and a [`ContainerResolver`]
//! answers questions about the container document (type, display name,
//! change notifications).

use crate::error::ArchiveResult;
use crate::id::{AccessMode, ArchiveId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// MIME type reported for directories, including the archive root
pub const DIRECTORY_MIME_TYPE: &str = "inode/directory";

/// Columns a caller may request for a document row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    DocumentId,
    DisplayName,
    MimeType,
    Size,
    LastModified,
}

/// Columns returned when the caller passes no projection
pub const DEFAULT_PROJECTION: &[Column] = &[
    Column::DocumentId,
    Column::DisplayName,
    Column::MimeType,
    Column::Size,
    Column::LastModified,
];

/// Metadata for one document. Columns outside the requested projection are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Seconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

impl DocumentRow {
    /// Drop every column not in `projection`
    pub fn project(mut self, projection: &[Column]) -> Self {
        if !projection.contains(&Column::DocumentId) {
            self.document_id = None;
        }
        if !projection.contains(&Column::DisplayName) {
            self.display_name = None;
        }
        if !projection.contains(&Column::MimeType) {
            self.mime_type = None;
        }
        if !projection.contains(&Column::Size) {
            self.size = None;
        }
        if !projection.contains(&Column::LastModified) {
            self.last_modified = None;
        }
        self
    }

    pub fn is_directory(&self) -> bool {
        self.mime_type.as_deref() == Some(DIRECTORY_MIME_TYPE)
    }
}

/// Cooperative cancellation flag, forwarded to handles untouched
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Requested thumbnail bounds in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub width: u32,
    pub height: u32,
}

/// Encoded thumbnail image
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Byte stream of an opened document
pub type DocumentStream = Box<dyn Read + Send>;

/// An opened archive.
///
/// Every method may be called from several threads at once. `close` is
/// called exactly once, after all other calls have returned.
pub trait ArchiveHandle: Send + Sync {
    /// List the direct children of a directory
    fn query_children(
        &self,
        parent: &ArchiveId,
        projection: &[Column],
    ) -> ArchiveResult<Vec<DocumentRow>>;

    /// Metadata of a single document
    fn query_document(&self, id: &ArchiveId, projection: &[Column]) -> ArchiveResult<DocumentRow>;

    fn document_type(&self, id: &ArchiveId) -> ArchiveResult<String>;

    fn is_child(&self, parent: &ArchiveId, id: &ArchiveId) -> ArchiveResult<bool>;

    fn open_document(
        &self,
        id: &ArchiveId,
        mode: AccessMode,
        cancel: &CancellationToken,
    ) -> ArchiveResult<DocumentStream>;

    fn open_thumbnail(
        &self,
        id: &ArchiveId,
        size_hint: SizeHint,
        cancel: &CancellationToken,
    ) -> ArchiveResult<Thumbnail>;

    /// Create a document and return its id
    fn create_document(
        &self,
        parent: &ArchiveId,
        mime_type: &str,
        display_name: &str,
    ) -> ArchiveResult<ArchiveId>;

    fn close(&self) -> ArchiveResult<()>;
}

/// Opens containers into archive handles. Called on a background thread.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, locator: &str, mode: AccessMode) -> ArchiveResult<Box<dyn ArchiveHandle>>;
}

/// Callback fired when a container document changes
pub type ChangeListener = Box<dyn Fn() + Send + Sync>;

/// Keeps a change listener registered until dropped.
///
/// Dropping may happen on the notifier thread, from inside the listener, so
/// the unregister callback must not wait for notification delivery to finish.
pub struct Subscription {
    unregister: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unregister: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unregister: Some(Box::new(unregister)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unregister.is_some())
            .finish()
    }
}

/// Content-resolution layer for container documents
pub trait ContainerResolver: Send + Sync {
    /// Declared MIME type, or `NotFound` if the container does not exist
    fn query_mime_type(&self, locator: &str) -> ArchiveResult<String>;

    fn query_display_name(&self, locator: &str) -> ArchiveResult<String>;

    /// Register for change notifications.
    ///
    /// Returns `None` when the container has no notification address.
    /// Called while the archive cache is locked, so the listener must not be
    /// invoked synchronously before this returns.
    fn register_change_listener(
        &self,
        locator: &str,
        listener: ChangeListener,
    ) -> Option<Subscription>;
}
