//! Backend interface for the remote endpoint.
//!
//! The backend is an external service; this crate only needs something that
//! takes a byte source, reports percent progress while it works, and returns
//! a record describing the stored file.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::executor::TransferEvent;
use crate::source::ByteSource;

/// What the backend knows about the file being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Record returned by the backend once a file is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Error reported by a backend. Only its message survives into
/// [`TransferError`](crate::TransferError).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

/// Progress reporter handed to the backend for one transfer.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<TransferEvent>,
}

impl ProgressSink {
    pub(crate) fn new(tx: mpsc::Sender<TransferEvent>) -> Self {
        Self { tx }
    }

    /// Reports progress as a percentage. Values are rounded and clamped to 0..=100.
    ///
    /// A closed receiver is ignored: the transfer keeps going even if nobody
    /// is watching.
    pub async fn report(&self, percent: f64) {
        let percent = percent.round().clamp(0.0, 100.0) as u8;
        let _ = self.tx.send(TransferEvent::Progress(percent)).await;
    }
}

/// Remote endpoint that stores files.
///
/// Boxed futures keep the trait object-safe so the orchestrator can hold an
/// `Arc<dyn UploadBackend>` and tests can swap in their own.
pub trait UploadBackend: Send + Sync {
    /// Sends one file, reporting progress through `progress`.
    fn upload_file<'a>(
        &'a self,
        source: &'a ByteSource,
        meta: &'a FileMeta,
        progress: ProgressSink,
    ) -> Pin<Box<dyn Future<Output = Result<RemoteRecord, BackendError>> + Send + 'a>>;
}
