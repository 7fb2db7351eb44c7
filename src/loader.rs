//! Lazily opened archive handles
//!
//! A [`Loader`] starts opening its archive on a background thread as soon as
//! it is created. Its status moves once, from `Opening` to either `Opened` or
//! `Failed`, and never goes back.
//!
//! The loader's reader/writer lock does not guard the status. It gates use
//! of the handle: every request holds the read side while it talks to the
//! handle, and teardown takes the write side, so the handle is only closed
//! once no request is in flight.

use crate::error::{ArchiveError, ArchiveResult};
use crate::handle::{ArchiveHandle, ArchiveOpener, Subscription};
use crate::id::{ArchiveId, CacheKey};
use parking_lot::{ArcRwLockReadGuard, Condvar, Mutex, RawRwLock, RwLock, RwLockWriteGuard};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Called with the archive root id once a loader finishes opening, successfully or not
pub type RefreshListener = Arc<dyn Fn(&ArchiveId) + Send + Sync>;

/// Shared access to a loader's handle, held for the duration of one request
pub type ReadGuard = ArcRwLockReadGuard<RawRwLock, ()>;

/// Observable loader status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderStatus {
    Opening,
    Opened,
    Failed,
}

impl fmt::Display for LoaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Opening => "opening",
            Self::Opened => "opened",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

enum LoaderState {
    Opening,
    Opened(Arc<dyn ArchiveHandle>),
    Failed(String),
}

impl LoaderState {
    fn status(&self) -> LoaderStatus {
        match self {
            Self::Opening => LoaderStatus::Opening,
            Self::Opened(_) => LoaderStatus::Opened,
            Self::Failed(_) => LoaderStatus::Failed,
        }
    }
}

struct Inner {
    state: LoaderState,
    closed: bool,
}

/// Per-archive handle holder
pub struct Loader {
    token: Uuid,
    key: CacheKey,
    inner: Mutex<Inner>,
    settled: Condvar,
    lock: Arc<RwLock<()>>,
    subscription: Mutex<Option<Subscription>>,
}

impl Loader {
    /// Create a loader and start opening the archive in the background
    pub fn open(
        key: CacheKey,
        opener: Arc<dyn ArchiveOpener>,
        on_settled: Option<RefreshListener>,
    ) -> Arc<Self> {
        let loader = Arc::new(Self::new(key));

        let worker = Arc::clone(&loader);
        let spawned = std::thread::Builder::new()
            .name("archive-open".to_string())
            .spawn(move || {
                let result = opener.open(&worker.key.locator, worker.key.mode);
                worker.settle(result);

                if let Some(refresh) = on_settled {
                    match worker.key.root_id() {
                        Ok(root) => refresh(&root),
                        Err(e) => warn!("Cannot notify refresh for {}: {}", worker.key, e),
                    }
                }
            });

        if let Err(e) = spawned {
            loader.settle(Err(ArchiveError::io("spawning archive open thread", e)));
        }

        loader
    }

    fn new(key: CacheKey) -> Self {
        Self {
            token: Uuid::new_v4(),
            key,
            inner: Mutex::new(Inner {
                state: LoaderState::Opening,
                closed: false,
            }),
            settled: Condvar::new(),
            lock: Arc::new(RwLock::new(())),
            subscription: Mutex::new(None),
        }
    }

    /// Record the outcome of the open. Only the loader's own opener calls this.
    fn settle(&self, result: ArchiveResult<Box<dyn ArchiveHandle>>) {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, LoaderState::Opening) {
            return;
        }

        let mut orphan = None;
        match result {
            Ok(handle) if inner.closed => {
                orphan = Some(handle);
                inner.state = LoaderState::Failed("closed before open completed".to_string());
            }
            Ok(handle) => {
                info!("Opened archive {}", self.key);
                inner.state = LoaderState::Opened(Arc::from(handle));
            }
            Err(e) => {
                warn!("Failed to open archive {}: {}", self.key, e);
                inner.state = LoaderState::Failed(e.to_string());
            }
        }
        drop(inner);
        self.settled.notify_all();

        if let Some(handle) = orphan {
            debug!("Archive {} was closed while opening, releasing handle", self.key);
            if let Err(e) = handle.close() {
                error!("Closing archive {} failed: {}", self.key, e);
            }
        }
    }

    /// Identity of this loader instance
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Current status, without blocking on the open
    pub fn status(&self) -> LoaderStatus {
        self.inner.lock().state.status()
    }

    /// Why the open failed, if it did
    pub fn failure(&self) -> Option<String> {
        match &self.inner.lock().state {
            LoaderState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Block until the open has settled and return the handle.
    ///
    /// Callers must hold a read guard from [`Loader::read_lock`] for as long
    /// as they use the returned handle.
    pub fn get(&self) -> ArchiveResult<Arc<dyn ArchiveHandle>> {
        let mut inner = self.inner.lock();
        while matches!(inner.state, LoaderState::Opening) && !inner.closed {
            self.settled.wait(&mut inner);
        }

        if inner.closed {
            return Err(ArchiveError::NotFound(format!(
                "archive {} has been closed",
                self.key
            )));
        }

        match &inner.state {
            LoaderState::Opened(handle) => Ok(Arc::clone(handle)),
            LoaderState::Failed(reason) => Err(ArchiveError::NotFound(format!(
                "archive {} could not be opened: {}",
                self.key, reason
            ))),
            LoaderState::Opening => Err(ArchiveError::NotFound(format!(
                "archive {} is not open",
                self.key
            ))),
        }
    }

    /// Shared access for one request
    pub fn read_lock(&self) -> ReadGuard {
        self.lock.read_arc()
    }

    /// Exclusive access, waits for every reader to finish
    pub fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    /// Keep a change-notification subscription alive until teardown
    pub fn attach_subscription(&self, subscription: Subscription) {
        *self.subscription.lock() = Some(subscription);
    }

    /// Tear the loader down: wait for readers, close the handle, drop the
    /// change subscription. Close failures are logged, never returned.
    ///
    /// Only the first call does anything.
    pub fn close(&self) {
        let _exclusive = self.write_lock();

        let handle = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            match &inner.state {
                LoaderState::Opened(handle) => Some(Arc::clone(handle)),
                _ => None,
            }
        };
        self.settled.notify_all();

        if let Some(handle) = handle {
            match handle.close() {
                Ok(()) => debug!("Closed archive {}", self.key),
                Err(e) => error!("Closing archive {} failed: {}", self.key, e),
            }
        }

        let subscription = self.subscription.lock().take();
        drop(subscription);
    }

    /// Whether teardown has run
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("token", &self.token)
            .field("key", &self.key)
            .field("status", &self.status())
            .finish()
    }
}
