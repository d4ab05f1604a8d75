//! Upload orchestrator: admits files, runs sessions and publishes state.
//!
//! Lock order is registry first, then session. Nothing awaits while holding
//! either lock except to acquire the other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fileflow_notify::{NotificationKind, Notifier};
use fileflow_transfer::{
    RawFile, RemoteRecord, TransferError, TransferEvent, TransferExecutor, TransferRequest,
    UploadBackend, ValidationError, validate,
};

use crate::aggregator::{SessionSnapshot, aggregate};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::registry::EntryRegistry;
use crate::thumbnail::{generate_thumbnail, wants_thumbnail};
use crate::types::{EntryId, EntryStatus, FileEntry, QueueEvent, SessionStatus, UploadSession};

/// Result of [`UploadOrchestrator::add_files`].
#[derive(Debug, Default)]
pub struct AddReport {
    /// Ids of the admitted files, in selection order.
    pub added: Vec<EntryId>,
    /// Names of rejected files with the reason.
    pub rejected: Vec<(String, ValidationError)>,
}

/// How one file of a session ended.
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub id: EntryId,
    pub name: String,
    pub result: Result<RemoteRecord, TransferError>,
}

/// Result of a finished session.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub session_id: u64,
    pub status: SessionStatus,
    pub outcomes: Vec<EntryOutcome>,
}

impl UploadReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Owns the entry registry and the current session.
pub struct UploadOrchestrator {
    inner: Arc<Inner>,
    events_rx: Option<mpsc::Receiver<QueueEvent>>,
}

struct Inner {
    config: QueueConfig,
    registry: RwLock<EntryRegistry>,
    session: Mutex<Option<UploadSession>>,
    executor: TransferExecutor,
    notifier: Arc<dyn Notifier>,
    events_tx: mpsc::Sender<QueueEvent>,
    next_session_id: AtomicU64,
    /// Set from session start until every transfer of it has returned, even
    /// after the session status has turned `Error`.
    transfers_running: AtomicBool,
    /// Cancels the pending auto-clear of a completed session.
    clear_timer: std::sync::Mutex<Option<CancellationToken>>,
    thumbnails: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl UploadOrchestrator {
    pub fn new(
        config: QueueConfig,
        backend: Arc<dyn UploadBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let shutdown = CancellationToken::new();
        let executor = TransferExecutor::new(backend, shutdown.child_token());

        let inner = Inner {
            config,
            registry: RwLock::new(EntryRegistry::new()),
            session: Mutex::new(None),
            executor,
            notifier,
            events_tx,
            next_session_id: AtomicU64::new(1),
            transfers_running: AtomicBool::new(false),
            clear_timer: std::sync::Mutex::new(None),
            thumbnails: Mutex::new(Vec::new()),
            shutdown,
        };

        Self {
            inner: Arc::new(inner),
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<QueueEvent>> {
        self.events_rx.take()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Validates and queues files as `Pending`, in the order given.
    ///
    /// Rejected files are reported through the notifier one by one. Image
    /// files get a thumbnail generated in the background; it is attached
    /// when ready and never delays queueing.
    pub async fn add_files(&self, files: Vec<RawFile>, allowed_extensions: &[String]) -> AddReport {
        let inner = &self.inner;
        let mut report = AddReport::default();
        let mut admitted = Vec::new();

        for file in files {
            if let Err(reason) = validate(&file, allowed_extensions) {
                debug!(file = %file.name, %reason, "file rejected");
                inner.notify(NotificationKind::FileRejected, &reason.to_string());
                report.rejected.push((file.name, reason));
                continue;
            }
            admitted.push(FileEntry::new(file));
        }

        if admitted.is_empty() {
            return report;
        }

        let thumbnail_jobs: Vec<_> = admitted
            .iter()
            .filter(|e| wants_thumbnail(e.mime_type()))
            .map(|e| (e.id(), e.source().clone()))
            .collect();

        {
            let mut registry = inner.registry.write().await;
            for entry in admitted {
                report.added.push(entry.id());
                registry.push(entry);
            }
        }
        for id in &report.added {
            inner.emit(QueueEvent::EntryAdded { id: *id });
        }

        let mut handles = Vec::with_capacity(thumbnail_jobs.len());
        for (id, source) in thumbnail_jobs {
            let inner = Arc::clone(inner);
            handles.push(tokio::spawn(async move {
                let result = tokio::select! {
                    _ = inner.shutdown.cancelled() => return,
                    result = generate_thumbnail(&source) => result,
                };
                match result {
                    Ok(url) => {
                        let attached = inner.registry.write().await.attach_thumbnail(id, url);
                        if attached {
                            debug!(entry = %id, "thumbnail attached");
                            inner.emit(QueueEvent::ThumbnailReady { id });
                        }
                    }
                    Err(e) => warn!(entry = %id, "thumbnail generation failed: {e}"),
                }
            }));
        }
        {
            let mut thumbnails = inner.thumbnails.lock().await;
            thumbnails.retain(|h| !h.is_finished());
            thumbnails.extend(handles);
        }

        let count = report.added.len();
        inner.notify(
            NotificationKind::FilesAdded,
            &format!("{count} file(s) added to upload queue"),
        );
        report
    }

    /// Uploads every currently pending file and waits for all of them.
    ///
    /// Files added after this call starts are not part of the session. A
    /// failed file marks the session as failed but does not stop the others.
    pub async fn start_upload(&self) -> Result<UploadReport, QueueError> {
        let inner = &self.inner;

        let (session_id, jobs, initial) = {
            let registry = inner.registry.read().await;
            let mut current = inner.session.lock().await;

            let pending = registry.pending();
            if pending.is_empty() {
                drop(current);
                drop(registry);
                inner.notify(NotificationKind::NothingToUpload, "No files to upload");
                return Err(QueueError::NoPendingFiles);
            }
            if inner.is_uploading(current.as_ref()) {
                return Err(QueueError::UploadInProgress);
            }
            inner.transfers_running.store(true, Ordering::Release);

            let session_id = inner.next_session_id.fetch_add(1, Ordering::Relaxed);
            let jobs: Vec<(EntryId, String, TransferRequest)> = pending
                .iter()
                .map(|e| (e.id(), e.name().to_string(), e.transfer_request()))
                .collect();
            let session = UploadSession::new(session_id, &pending);
            let initial = aggregate(&session, &registry, session.elapsed());
            *current = Some(session);

            (session_id, jobs, initial)
        };
        let _running = RunningFlag(&inner.transfers_running);

        inner.cancel_clear_timer();
        info!(
            session = session_id,
            files = initial.total_files,
            bytes = initial.total_size,
            "upload session started"
        );
        inner.emit(QueueEvent::SessionUpdated(initial));

        let limit = inner
            .config
            .max_concurrent_transfers
            .map(|n| Semaphore::new(n.max(1)));

        let drivers = jobs.into_iter().map(|(id, name, request)| {
            let limit = limit.as_ref();
            async move {
                let _permit = match limit {
                    Some(sem) => sem.acquire().await.ok(),
                    None => None,
                };
                let result = inner.drive(session_id, id, request).await;
                EntryOutcome { id, name, result }
            }
        });
        let outcomes = join_all(drivers).await;

        let status = inner.finish_session(session_id).await;
        Ok(UploadReport {
            session_id,
            status,
            outcomes,
        })
    }

    /// Removes a file whatever its status. A running transfer for it keeps
    /// going; its later updates are ignored.
    pub async fn remove_file(&self, id: EntryId) -> bool {
        let inner = &self.inner;
        let removed = inner.registry.write().await.remove(id);
        if removed.is_none() {
            return false;
        }
        inner.emit(QueueEvent::EntryRemoved { id });
        inner.notify(NotificationKind::FileRemoved, "File removed from upload queue");
        true
    }

    /// Drops every completed file. Returns how many were removed.
    pub async fn clear_completed(&self) -> usize {
        let inner = &self.inner;
        let removed = inner.registry.write().await.clear_completed();
        for id in &removed {
            inner.emit(QueueEvent::EntryRemoved { id: *id });
        }
        inner.notify(NotificationKind::CompletedCleared, "Completed files cleared");
        removed.len()
    }

    /// Empties the queue and forgets the session.
    ///
    /// Refused (returns `false`) while a session is uploading.
    pub async fn reset_all(&self) -> bool {
        let inner = &self.inner;
        let removed: Vec<EntryId> = {
            let mut registry = inner.registry.write().await;
            let mut session = inner.session.lock().await;
            if inner.is_uploading(session.as_ref()) {
                debug!("reset refused while uploading");
                return false;
            }
            *session = None;
            let ids = registry.iter().map(|e| e.id()).collect();
            registry.clear();
            ids
        };

        inner.cancel_clear_timer();
        for id in removed {
            inner.emit(QueueEvent::EntryRemoved { id });
        }
        inner.emit(QueueEvent::SessionCleared);
        inner.notify(NotificationKind::QueueReset, "Upload queue cleared");
        true
    }

    /// Copy of every entry, in queue order.
    pub async fn entries(&self) -> Vec<FileEntry> {
        self.inner.registry.read().await.iter().cloned().collect()
    }

    pub async fn entry(&self, id: EntryId) -> Option<FileEntry> {
        self.inner.registry.read().await.get(id).cloned()
    }

    pub async fn session(&self) -> Option<UploadSession> {
        self.inner.session.lock().await.clone()
    }

    /// Aggregated view of the current session against the latest registry.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let registry = self.inner.registry.read().await;
        let session = self.inner.session.lock().await;
        session
            .as_ref()
            .map(|s| aggregate(s, &registry, s.elapsed()))
    }

    pub async fn has_pending(&self) -> bool {
        self.inner
            .registry
            .read()
            .await
            .has_status(EntryStatus::Pending)
    }

    pub async fn has_completed(&self) -> bool {
        self.inner
            .registry
            .read()
            .await
            .has_status(EntryStatus::Completed)
    }

    /// Waits for every thumbnail scheduled so far to finish or fail.
    pub async fn thumbnails_settled(&self) {
        let handles = std::mem::take(&mut *self.inner.thumbnails.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("thumbnail task failed: {e}");
            }
        }
    }
}

impl Drop for UploadOrchestrator {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

/// Clears the running flag when a session's transfers are done, or when
/// `start_upload` is dropped mid-session.
struct RunningFlag<'a>(&'a AtomicBool);

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Inner {
    /// Whether a session still has transfers in flight or queued for a slot.
    fn is_uploading(&self, session: Option<&UploadSession>) -> bool {
        self.transfers_running.load(Ordering::Acquire)
            || session.is_some_and(|s| s.status() == SessionStatus::Uploading)
    }

    fn emit(&self, event: QueueEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            warn!("dropping queue event: {e}");
        }
    }

    fn notify(&self, kind: NotificationKind, message: &str) {
        debug!(?kind, message, "notify");
        self.notifier.notify(kind, message);
    }

    /// Runs one file's transfer, mirroring its events into the registry.
    async fn drive(
        &self,
        session_id: u64,
        id: EntryId,
        request: TransferRequest,
    ) -> Result<RemoteRecord, TransferError> {
        if self.registry.write().await.mark_uploading(id) {
            self.emit(QueueEvent::EntryUpdated {
                id,
                status: EntryStatus::Uploading,
                progress: 0,
            });
        }

        let mut task = self.executor.spawn(request);
        while let Some(event) = task.events.recv().await {
            match event {
                TransferEvent::Started => debug!(entry = %id, "transfer running"),
                TransferEvent::Progress(percent) => {
                    self.record_progress(session_id, id, percent).await;
                }
            }
        }

        let result = task.join().await;
        match &result {
            Ok(record) => {
                debug!(entry = %id, record = %record.id, "transfer completed");
                self.record_success(session_id, id).await;
            }
            Err(e) => {
                error!(entry = %id, "{e}");
                self.record_failure(session_id, id).await;
            }
        }
        result
    }

    async fn record_progress(&self, session_id: u64, id: EntryId, percent: u8) {
        let (progress, snapshot) = {
            let mut registry = self.registry.write().await;
            let Some(progress) = registry.apply_progress(id, percent) else {
                return;
            };
            let snapshot = self.refresh_session(&registry, session_id, |_| {}).await;
            (progress, snapshot)
        };

        self.emit(QueueEvent::EntryUpdated {
            id,
            status: EntryStatus::Uploading,
            progress,
        });
        if let Some(snapshot) = snapshot {
            self.emit(QueueEvent::SessionUpdated(snapshot));
        }
    }

    async fn record_success(&self, session_id: u64, id: EntryId) {
        let (marked, snapshot) = {
            let mut registry = self.registry.write().await;
            let marked = registry.mark_completed(id);
            let snapshot = self
                .refresh_session(&registry, session_id, |s| s.completed_files += 1)
                .await;
            (marked, snapshot)
        };

        if marked {
            self.emit(QueueEvent::EntryUpdated {
                id,
                status: EntryStatus::Completed,
                progress: 100,
            });
        }
        if let Some(snapshot) = snapshot {
            self.emit(QueueEvent::SessionUpdated(snapshot));
        }
    }

    async fn record_failure(&self, session_id: u64, id: EntryId) {
        let mut first_failure = false;
        let (progress, snapshot) = {
            let mut registry = self.registry.write().await;
            let progress = registry
                .mark_failed(id)
                .then(|| registry.get(id).map(|e| e.progress()))
                .flatten();
            let snapshot = self
                .refresh_session(&registry, session_id, |s| {
                    if s.status == SessionStatus::Uploading {
                        s.status = SessionStatus::Error;
                        first_failure = true;
                    }
                })
                .await;
            (progress, snapshot)
        };

        if let Some(progress) = progress {
            self.emit(QueueEvent::EntryUpdated {
                id,
                status: EntryStatus::Error,
                progress,
            });
        }
        if let Some(snapshot) = snapshot {
            self.emit(QueueEvent::SessionUpdated(snapshot));
        }
        if first_failure {
            self.notify(NotificationKind::UploadFailed, "Upload failed");
        }
    }

    /// Settles the session once every transfer has returned.
    async fn finish_session(self: &Arc<Self>, session_id: u64) -> SessionStatus {
        let mut succeeded = false;
        let snapshot = {
            let registry = self.registry.read().await;
            self.refresh_session(&registry, session_id, |s| {
                if s.status == SessionStatus::Uploading {
                    s.status = SessionStatus::Completed;
                    s.uploaded_size = s.total_size;
                    succeeded = true;
                }
            })
            .await
        };

        let Some(snapshot) = snapshot else {
            return SessionStatus::Idle;
        };
        let status = snapshot.status;
        info!(
            session = session_id,
            ?status,
            completed = snapshot.completed_files,
            total = snapshot.total_files,
            "upload session finished"
        );
        self.emit(QueueEvent::SessionUpdated(snapshot));

        if succeeded {
            self.notify(NotificationKind::UploadSucceeded, "All files uploaded successfully!");
            self.schedule_clear(session_id);
        }
        status
    }

    /// Applies `update` to the session if it is still `session_id`, then
    /// stores and returns the recomputed aggregate.
    async fn refresh_session(
        &self,
        registry: &EntryRegistry,
        session_id: u64,
        update: impl FnOnce(&mut UploadSession),
    ) -> Option<SessionSnapshot> {
        let mut current = self.session.lock().await;
        let session = current.as_mut().filter(|s| s.id == session_id)?;
        update(session);
        let snapshot = aggregate(session, registry, session.elapsed());
        session.uploaded_size = snapshot.uploaded_size;
        Some(snapshot)
    }

    /// Clears a completed session after the configured linger time.
    fn schedule_clear(self: &Arc<Self>, session_id: u64) {
        let token = self.shutdown.child_token();
        if let Ok(mut guard) = self.clear_timer.lock() {
            if let Some(previous) = guard.replace(token.clone()) {
                previous.cancel();
            }
        }

        let inner = Arc::clone(self);
        let linger = self.config.completion_linger();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(linger) => inner.clear_finished_session(session_id).await,
            }
        });
    }

    fn cancel_clear_timer(&self) {
        if let Ok(mut guard) = self.clear_timer.lock() {
            if let Some(token) = guard.take() {
                token.cancel();
            }
        }
    }

    async fn clear_finished_session(&self, session_id: u64) {
        let cleared = {
            let mut current = self.session.lock().await;
            let done = current
                .as_ref()
                .is_some_and(|s| s.id == session_id && s.status == SessionStatus::Completed);
            if done {
                *current = None;
            }
            done
        };
        if cleared {
            debug!(session = session_id, "completed session cleared");
            self.emit(QueueEvent::SessionCleared);
        }
    }
}
