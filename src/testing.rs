//! In-memory collaborators for unit tests

use crate::error::{ArchiveError, ArchiveResult};
use crate::handle::{
    ArchiveHandle, ArchiveOpener, CancellationToken, ChangeListener, Column, ContainerResolver,
    DocumentRow, DocumentStream, SizeHint, Subscription, Thumbnail, DIRECTORY_MIME_TYPE,
};
use crate::id::{AccessMode, ArchiveId};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll until `cond` holds, panicking after five seconds
pub fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// One-shot latch that blocks waiters until released
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(false),
            cv: Condvar::new(),
        })
    }

    pub fn release(&self) {
        *self.open.lock() = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cv.wait(&mut open);
        }
    }
}

/// What tests can observe about one opened handle
#[derive(Default)]
pub struct HandleProbe {
    closed: AtomicBool,
    close_calls: AtomicUsize,
    used_after_close: AtomicUsize,
    active_ops: AtomicUsize,
}

impl HandleProbe {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn used_after_close(&self) -> usize {
        self.used_after_close.load(Ordering::SeqCst)
    }

    pub fn active_ops(&self) -> usize {
        self.active_ops.load(Ordering::SeqCst)
    }
}

struct FakeHandle {
    probe: Arc<HandleProbe>,
    mode: AccessMode,
    entries: Vec<(String, bool)>,
    op_gate: Option<Arc<Gate>>,
    failing_close: bool,
}

impl FakeHandle {
    fn check_open(&self) -> ArchiveResult<()> {
        if self.probe.is_closed() {
            self.probe.used_after_close.fetch_add(1, Ordering::SeqCst);
            return Err(ArchiveError::Unsupported("handle used after close".to_string()));
        }
        Ok(())
    }

    fn entry(&self, path: &str) -> ArchiveResult<&(String, bool)> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))
    }

    fn row(&self, id: &ArchiveId, is_dir: bool) -> DocumentRow {
        let name = id.path().rsplit('/').next().unwrap_or_default();
        DocumentRow {
            document_id: Some(id.to_document_id()),
            display_name: Some(name.to_string()),
            mime_type: Some(if is_dir { DIRECTORY_MIME_TYPE } else { "text/plain" }.to_string()),
            size: Some(if is_dir { 0 } else { id.path().len() as u64 }),
            last_modified: None,
        }
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

impl ArchiveHandle for FakeHandle {
    fn query_children(
        &self,
        parent: &ArchiveId,
        projection: &[Column],
    ) -> ArchiveResult<Vec<DocumentRow>> {
        self.check_open()?;
        let mut rows = Vec::new();
        for (path, is_dir) in &self.entries {
            if parent_of(path) == parent.path() {
                let id = parent.with_path(path.clone())?;
                rows.push(self.row(&id, *is_dir).project(projection));
            }
        }
        Ok(rows)
    }

    fn query_document(&self, id: &ArchiveId, projection: &[Column]) -> ArchiveResult<DocumentRow> {
        self.check_open()?;
        let (_, is_dir) = self.entry(id.path())?;
        Ok(self.row(id, *is_dir).project(projection))
    }

    fn document_type(&self, id: &ArchiveId) -> ArchiveResult<String> {
        Ok(self
            .query_document(id, &[Column::MimeType])?
            .mime_type
            .unwrap_or_default())
    }

    fn is_child(&self, parent: &ArchiveId, id: &ArchiveId) -> ArchiveResult<bool> {
        self.check_open()?;
        Ok(id.path().starts_with(parent.path()) && id.path() != parent.path())
    }

    fn open_document(
        &self,
        id: &ArchiveId,
        _mode: AccessMode,
        cancel: &CancellationToken,
    ) -> ArchiveResult<DocumentStream> {
        self.check_open()?;
        self.probe.active_ops.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.op_gate {
            gate.wait();
        }
        let result = if cancel.is_cancelled() {
            Err(ArchiveError::Cancelled)
        } else {
            self.check_open()
                .and_then(|_| self.entry(id.path()).map(|_| ()))
                .map(|_| Box::new(Cursor::new(id.path().as_bytes().to_vec())) as DocumentStream)
        };
        self.probe.active_ops.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn open_thumbnail(
        &self,
        id: &ArchiveId,
        size_hint: SizeHint,
        _cancel: &CancellationToken,
    ) -> ArchiveResult<Thumbnail> {
        self.check_open()?;
        self.entry(id.path())?;
        Ok(Thumbnail {
            mime_type: "image/png".to_string(),
            bytes: vec![0; (size_hint.width * size_hint.height) as usize],
        })
    }

    fn create_document(
        &self,
        parent: &ArchiveId,
        _mime_type: &str,
        display_name: &str,
    ) -> ArchiveResult<ArchiveId> {
        self.check_open()?;
        if self.mode != AccessMode::Write {
            return Err(ArchiveError::Unsupported("archive is read-only".to_string()));
        }
        let path = if parent.is_root() {
            format!("/{}", display_name)
        } else {
            format!("{}/{}", parent.path(), display_name)
        };
        parent.with_path(path)
    }

    fn close(&self) -> ArchiveResult<()> {
        self.probe.close_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.closed.store(true, Ordering::SeqCst);
        if self.failing_close {
            return Err(ArchiveError::io(
                "closing fake archive",
                std::io::Error::other("disk went away"),
            ));
        }
        Ok(())
    }
}

/// Opener producing [`FakeHandle`]s, with knobs for slow and failing opens
pub struct FakeOpener {
    opens: AtomicUsize,
    probes: Mutex<Vec<Arc<HandleProbe>>>,
    gate: Mutex<Option<Arc<Gate>>>,
    op_gate: Mutex<Option<Arc<Gate>>>,
    failing: Mutex<HashSet<String>>,
    failing_close: AtomicBool,
    entries: Vec<(String, bool)>,
}

impl FakeOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            opens: AtomicUsize::new(0),
            probes: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            op_gate: Mutex::new(None),
            failing: Mutex::new(HashSet::new()),
            failing_close: AtomicBool::new(false),
            entries: vec![
                ("/readme.txt".to_string(), false),
                ("/docs".to_string(), true),
                ("/docs/guide.txt".to_string(), false),
            ],
        })
    }

    /// Block every open until `gate` is released
    pub fn with_gate(self: Arc<Self>, gate: Arc<Gate>) -> Arc<Self> {
        *self.gate.lock() = Some(gate);
        self
    }

    /// Block `open_document` on every handle until `gate` is released
    pub fn with_op_gate(self: Arc<Self>, gate: Arc<Gate>) -> Arc<Self> {
        *self.op_gate.lock() = Some(gate);
        self
    }

    pub fn failing(self: Arc<Self>, locator: &str) -> Arc<Self> {
        self.failing.lock().insert(locator.to_string());
        self
    }

    pub fn failing_close(self: Arc<Self>) -> Arc<Self> {
        self.failing_close.store(true, Ordering::SeqCst);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().len()
    }

    /// Probe of the `n`th successfully opened handle
    pub fn probe(&self, n: usize) -> Arc<HandleProbe> {
        Arc::clone(&self.probes.lock()[n])
    }
}

impl ArchiveOpener for FakeOpener {
    fn open(&self, locator: &str, mode: AccessMode) -> ArchiveResult<Box<dyn ArchiveHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.wait();
        }

        if self.failing.lock().contains(locator) {
            return Err(ArchiveError::open_failed(locator, "corrupt central directory"));
        }

        let probe = Arc::new(HandleProbe::default());
        self.probes.lock().push(Arc::clone(&probe));
        Ok(Box::new(FakeHandle {
            probe,
            mode,
            entries: self.entries.clone(),
            op_gate: self.op_gate.lock().clone(),
            failing_close: self.failing_close.load(Ordering::SeqCst),
        }))
    }
}

type Listeners = Arc<Mutex<HashMap<String, Vec<(u64, Arc<dyn Fn() + Send + Sync>)>>>>;

/// Resolver backed by a map of known containers
pub struct FakeResolver {
    containers: Mutex<HashMap<String, (String, String)>>,
    listeners: Listeners,
    next_listener: AtomicU64,
    notifications: AtomicBool,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            containers: Mutex::new(HashMap::new()),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener: AtomicU64::new(0),
            notifications: AtomicBool::new(true),
        })
    }

    pub fn with_container(self: Arc<Self>, locator: &str, mime_type: &str) -> Arc<Self> {
        let name = locator.rsplit('/').next().unwrap_or(locator).to_string();
        self.containers
            .lock()
            .insert(locator.to_string(), (mime_type.to_string(), name));
        self
    }

    pub fn with_zip(self: Arc<Self>, locator: &str) -> Arc<Self> {
        self.with_container(locator, "application/zip")
    }

    pub fn without_notifications(self: Arc<Self>) -> Arc<Self> {
        self.notifications.store(false, Ordering::SeqCst);
        self
    }

    /// Listeners a notification for `locator` would reach right now
    pub fn pending_notification(&self, locator: &str) -> Vec<Arc<dyn Fn() + Send + Sync>> {
        self.listeners
            .lock()
            .get(locator)
            .map(|l| l.iter().map(|(_, f)| Arc::clone(f)).collect())
            .unwrap_or_default()
    }

    /// Deliver a change notification for `locator`
    pub fn fire(&self, locator: &str) {
        for listener in self.pending_notification(locator) {
            listener();
        }
    }

    pub fn listener_count(&self, locator: &str) -> usize {
        self.listeners.lock().get(locator).map_or(0, Vec::len)
    }
}

impl ContainerResolver for FakeResolver {
    fn query_mime_type(&self, locator: &str) -> ArchiveResult<String> {
        self.containers
            .lock()
            .get(locator)
            .map(|(mime, _)| mime.clone())
            .ok_or_else(|| ArchiveError::NotFound(locator.to_string()))
    }

    fn query_display_name(&self, locator: &str) -> ArchiveResult<String> {
        self.containers
            .lock()
            .get(locator)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| ArchiveError::NotFound(locator.to_string()))
    }

    fn register_change_listener(
        &self,
        locator: &str,
        listener: ChangeListener,
    ) -> Option<Subscription> {
        if !self.notifications.load(Ordering::SeqCst) {
            return None;
        }

        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .entry(locator.to_string())
            .or_default()
            .push((id, Arc::from(listener)));

        let listeners = Arc::clone(&self.listeners);
        let locator = locator.to_string();
        Some(Subscription::new(move || {
            if let Some(list) = listeners.lock().get_mut(&locator) {
                list.retain(|(lid, _)| *lid != id);
            }
        }))
    }
}
