//! Transfer executor: one spawned task per file.
//!
//! The task re-checks the size limit, announces itself with
//! [`TransferEvent::Started`], then runs the backend. Progress flows out on an
//! mpsc channel and the final result comes back through the join handle.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{FileMeta, ProgressSink, RemoteRecord, UploadBackend};
use crate::source::ByteSource;
use crate::{MAX_FILE_SIZE, TransferError};

/// Per-transfer event capacity. A slow consumer back-pressures the backend.
const EVENT_BUFFER: usize = 32;

/// Event emitted by a running transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// The backend has been invoked for this file.
    Started,
    /// Percent complete, 0..=100.
    Progress(u8),
}

/// Everything the executor needs to send one file.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub meta: FileMeta,
    pub source: ByteSource,
}

/// A running transfer: its event stream and its eventual result.
pub struct TransferTask {
    pub events: mpsc::Receiver<TransferEvent>,
    pub handle: JoinHandle<Result<RemoteRecord, TransferError>>,
}

impl TransferTask {
    /// Waits for the result, turning a panicked or aborted task into a
    /// [`TransferError`].
    pub async fn join(self) -> Result<RemoteRecord, TransferError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(TransferError::new(format!("transfer task failed: {e}"))),
        }
    }
}

/// Launches transfers against a shared backend.
#[derive(Clone)]
pub struct TransferExecutor {
    backend: Arc<dyn UploadBackend>,
    cancel: CancellationToken,
}

impl TransferExecutor {
    /// Creates an executor. Cancelling `cancel` stops every transfer it launched.
    pub fn new(backend: Arc<dyn UploadBackend>, cancel: CancellationToken) -> Self {
        Self { backend, cancel }
    }

    /// Spawns the transfer task for one file.
    pub fn spawn(&self, request: TransferRequest) -> TransferTask {
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let backend = Arc::clone(&self.backend);
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            let TransferRequest { meta, source } = request;

            if meta.size > MAX_FILE_SIZE {
                warn!(file = %meta.name, size = meta.size, "refusing oversized transfer");
                return Err(TransferError::new("File size exceeds 100MB limit"));
            }

            let _ = events_tx.send(TransferEvent::Started).await;
            debug!(file = %meta.name, size = meta.size, "transfer started");

            let sink = ProgressSink::new(events_tx);
            tokio::select! {
                _ = cancel.cancelled() => Err(TransferError::new("cancelled")),
                result = backend.upload_file(&source, &meta, sink) => {
                    result.map_err(TransferError::from)
                }
            }
        });

        TransferTask { events, handle }
    }
}
