//! Request dispatch for documents inside archives
//!
//! Every request follows the same protocol:
//!
//! 1. Parse the document id.
//! 2. Under the cache guard, find or create the loader for the archive and
//!    take its read lock before the guard is released.
//! 3. Branch on the loader's status and delegate to the handle.
//! 4. Drop the read lock when the [`LoaderGuard`] goes out of scope.
//!
//! Listings never wait for an archive to open: they come back empty with a
//! [`LoadState`] telling the caller to show progress or an error. Every other
//! operation waits for the open to settle.

use crate::cache::{ArchiveCache, CacheGuard, OPENED_ARCHIVES_CACHE_SIZE};
use crate::error::{ArchiveError, ArchiveResult};
use crate::handle::{
    ArchiveHandle, ArchiveOpener, CancellationToken, Column, ContainerResolver, DocumentRow,
    DocumentStream, SizeHint, Thumbnail, DEFAULT_PROJECTION, DIRECTORY_MIME_TYPE,
};
use crate::id::{AccessMode, ArchiveId};
use crate::loader::{Loader, LoaderStatus, ReadGuard, RefreshListener};
use serde::Serialize;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Container MIME types handled as archives
pub const ZIP_MIME_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip",
    "application/x-zip-compressed",
];

/// Message shown in listings of archives that failed to open
pub const DEFAULT_LOADING_FAILED_MESSAGE: &str = "Archive could not be opened";

/// Whether a container of this type can be browsed as an archive
pub fn is_supported_type(mime_type: &str) -> bool {
    ZIP_MIME_TYPES.contains(&mime_type)
}

/// Document id of an archive's root directory
pub fn build_root_id(locator: &str, mode: AccessMode) -> ArchiveResult<String> {
    Ok(ArchiveId::root(locator, mode)?.to_document_id())
}

/// Whether a listing reflects the archive's contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadState {
    Ready,
    Loading,
    Error(String),
}

/// Children of a directory plus the archive's load state
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub rows: Vec<DocumentRow>,
    pub state: LoadState,
    /// Root id the caller can watch for a refresh once loading finishes
    pub notification_id: ArchiveId,
}

impl Listing {
    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Tuning for an [`ArchivesCoordinator`]
#[derive(Clone)]
pub struct CoordinatorOptions {
    pub capacity: usize,
    pub loading_failed_message: String,
    pub refresh: Option<RefreshListener>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            capacity: OPENED_ARCHIVES_CACHE_SIZE,
            loading_failed_message: DEFAULT_LOADING_FAILED_MESSAGE.to_string(),
            refresh: None,
        }
    }
}

/// A loader borrowed for one request.
///
/// Holds the loader's read lock, so the archive cannot be closed until this
/// guard is dropped.
pub struct LoaderGuard {
    loader: Arc<Loader>,
    _read: ReadGuard,
}

impl LoaderGuard {
    pub fn status(&self) -> LoaderStatus {
        self.loader.status()
    }

    /// Handle of the opened archive, waiting for the open if needed
    pub fn handle(&self) -> ArchiveResult<Arc<dyn ArchiveHandle>> {
        self.loader.get()
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }
}

struct Shared {
    cache: ArchiveCache,
    opener: Arc<dyn ArchiveOpener>,
    resolver: Arc<dyn ContainerResolver>,
    loading_failed_message: String,
    refresh: Option<RefreshListener>,
}

/// Entry point for every request against archived documents.
///
/// Cloning is cheap and clones share one cache.
#[derive(Clone)]
pub struct ArchivesCoordinator {
    shared: Arc<Shared>,
}

impl ArchivesCoordinator {
    pub fn new(opener: Arc<dyn ArchiveOpener>, resolver: Arc<dyn ContainerResolver>) -> Self {
        Self::with_options(opener, resolver, CoordinatorOptions::default())
    }

    pub fn with_options(
        opener: Arc<dyn ArchiveOpener>,
        resolver: Arc<dyn ContainerResolver>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache: ArchiveCache::new(options.capacity),
                opener,
                resolver,
                loading_failed_message: options.loading_failed_message,
                refresh: options.refresh,
            }),
        }
    }

    /// Borrow the loader for the archive containing `id`, creating it on a miss
    pub fn acquire(&self, id: &ArchiveId) -> ArchiveResult<LoaderGuard> {
        let mut cache = self.shared.cache.lock();
        let loader = match cache.get(&id.key()) {
            Some(loader) => loader,
            None => self.create_loader(&mut cache, id)?,
        };
        let read = loader.read_lock();
        drop(cache);

        Ok(LoaderGuard {
            loader,
            _read: read,
        })
    }

    fn create_loader(
        &self,
        cache: &mut CacheGuard<'_>,
        id: &ArchiveId,
    ) -> ArchiveResult<Arc<Loader>> {
        let key = id.key();
        let mime_type = self.shared.resolver.query_mime_type(id.locator())?;
        if !is_supported_type(&mime_type) {
            return Err(ArchiveError::UnsupportedType(mime_type));
        }

        let loader = Loader::open(
            key.clone(),
            Arc::clone(&self.shared.opener),
            self.shared.refresh.clone(),
        );

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let token = loader.token();
        let listener_key = key.clone();
        let subscription = self.shared.resolver.register_change_listener(
            id.locator(),
            Box::new(move || {
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                if shared.cache.lock().remove_if_current(&listener_key, token) {
                    info!("Archive {} changed, dropped cached loader", listener_key);
                }
            }),
        );
        if let Some(subscription) = subscription {
            loader.attach_subscription(subscription);
        }

        debug!("Caching new loader for {}", key);
        cache.put(key, Arc::clone(&loader));
        Ok(loader)
    }

    /// Borrow the opened handle for a non-listing request
    fn with_handle<T>(
        &self,
        id: &ArchiveId,
        op: impl FnOnce(&dyn ArchiveHandle) -> ArchiveResult<T>,
    ) -> ArchiveResult<T> {
        let guard = self.acquire(id)?;
        let handle = guard.handle()?;
        op(handle.as_ref())
    }

    /// List the children of a directory inside an archive
    pub fn query_children(
        &self,
        document_id: &str,
        projection: Option<&[Column]>,
    ) -> ArchiveResult<Listing> {
        let id = ArchiveId::parse(document_id)?;
        let projection = projection.unwrap_or(DEFAULT_PROJECTION);
        let notification_id = id.to_root();

        let guard = self.acquire(&id)?;
        let state = match guard.status() {
            LoaderStatus::Opened => {
                let rows = guard.handle()?.query_children(&id, projection)?;
                return Ok(Listing {
                    rows,
                    state: LoadState::Ready,
                    notification_id,
                });
            }
            LoaderStatus::Opening => LoadState::Loading,
            LoaderStatus::Failed => {
                if let Some(reason) = guard.loader().failure() {
                    debug!("Listing {} of failed archive: {}", id, reason);
                }
                LoadState::Error(self.shared.loading_failed_message.clone())
            }
        };

        Ok(Listing {
            rows: Vec::new(),
            state,
            notification_id,
        })
    }

    /// Metadata of one document. The root row comes from the container itself.
    pub fn query_document(
        &self,
        document_id: &str,
        projection: Option<&[Column]>,
    ) -> ArchiveResult<DocumentRow> {
        let id = ArchiveId::parse(document_id)?;
        let projection = projection.unwrap_or(DEFAULT_PROJECTION);

        if id.is_root() {
            let display_name = self
                .shared
                .resolver
                .query_display_name(id.locator())
                .map_err(|e| {
                    ArchiveError::NotFound(format!(
                        "cannot resolve display name of {}: {}",
                        id.locator(),
                        e
                    ))
                })?;

            let row = DocumentRow {
                document_id: Some(id.to_document_id()),
                display_name: Some(display_name),
                mime_type: Some(DIRECTORY_MIME_TYPE.to_string()),
                size: Some(0),
                last_modified: None,
            };
            return Ok(row.project(projection));
        }

        self.with_handle(&id, |handle| handle.query_document(&id, projection))
    }

    pub fn document_type(&self, document_id: &str) -> ArchiveResult<String> {
        let id = ArchiveId::parse(document_id)?;
        if id.is_root() {
            return Ok(DIRECTORY_MIME_TYPE.to_string());
        }

        self.with_handle(&id, |handle| handle.document_type(&id))
    }

    /// Whether `document_id` lives below `parent_id`. Documents in different
    /// archives are never related.
    pub fn is_child(&self, parent_id: &str, document_id: &str) -> ArchiveResult<bool> {
        let parent = ArchiveId::parse(parent_id)?;
        let id = ArchiveId::parse(document_id)?;
        if parent.key() != id.key() {
            return Ok(false);
        }

        self.with_handle(&id, |handle| handle.is_child(&parent, &id))
    }

    pub fn open_document(
        &self,
        document_id: &str,
        mode: AccessMode,
        cancel: &CancellationToken,
    ) -> ArchiveResult<DocumentStream> {
        let id = ArchiveId::parse(document_id)?;
        self.with_handle(&id, |handle| handle.open_document(&id, mode, cancel))
    }

    pub fn open_thumbnail(
        &self,
        document_id: &str,
        size_hint: SizeHint,
        cancel: &CancellationToken,
    ) -> ArchiveResult<Thumbnail> {
        let id = ArchiveId::parse(document_id)?;
        self.with_handle(&id, |handle| handle.open_thumbnail(&id, size_hint, cancel))
    }

    /// Create a document and return its document id
    pub fn create_document(
        &self,
        parent_id: &str,
        mime_type: &str,
        display_name: &str,
    ) -> ArchiveResult<String> {
        let parent = ArchiveId::parse(parent_id)?;
        self.with_handle(&parent, |handle| {
            handle.create_document(&parent, mime_type, display_name)
        })
        .map(|id| id.to_document_id())
    }

    /// Close the archive containing `document_id`. Does nothing if it is not cached.
    pub fn close_archive(&self, document_id: &str) -> ArchiveResult<()> {
        let id = ArchiveId::parse(document_id)?;
        if self.shared.cache.remove(&id.key()) {
            info!("Closed archive {}", id.key());
        }
        Ok(())
    }

    /// Close every cached archive, waiting for in-flight requests.
    ///
    /// The coordinator stays usable; later requests open archives afresh.
    pub fn close_all(&self) {
        self.shared.cache.evict_all();
        info!("Closed all archives");
    }

    /// Status of the cached loader for `document_id`, without opening anything
    pub fn loader_status(&self, document_id: &str) -> ArchiveResult<Option<LoaderStatus>> {
        let id = ArchiveId::parse(document_id)?;
        let cache = self.shared.cache.lock();
        Ok(cache.peek(&id.key()).map(|loader| loader.status()))
    }

    /// Number of archives currently cached
    pub fn cached_archives(&self) -> usize {
        self.shared.cache.len()
    }
}
