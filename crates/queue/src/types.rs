//! Data types for the upload queue.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use fileflow_transfer::{ByteSource, FileMeta, RawFile, TransferRequest};

use crate::aggregator::SessionSnapshot;

/// Opaque identity of a queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0.simple())
    }
}

/// Lifecycle of a single entry.
///
/// `Pending -> Uploading -> Completed`, and `Pending | Uploading -> Error`.
/// `Completed` and `Error` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

impl EntryStatus {
    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        use EntryStatus::*;
        matches!(
            (self, next),
            (Pending, Uploading) | (Uploading, Completed) | (Pending | Uploading, Error)
        )
    }
}

/// One queued file and its transfer state.
///
/// Fields are private so the status/progress invariants can only change
/// through the registry: progress is 100 exactly when the status is
/// `Completed`, and the byte source never changes after admission.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    id: EntryId,
    name: String,
    size: u64,
    mime_type: String,
    status: EntryStatus,
    progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    source: ByteSource,
}

impl FileEntry {
    /// Admits a validated file as a `Pending` entry.
    pub fn new(file: RawFile) -> Self {
        Self {
            id: EntryId::new(),
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            status: EntryStatus::Pending,
            progress: 0,
            thumbnail: None,
            created_at: Utc::now(),
            source: file.source,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    /// Percent complete, 0..=100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// `data:` URL of the preview image, once one has been produced.
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    /// Builds the executor request for this entry.
    pub(crate) fn transfer_request(&self) -> TransferRequest {
        TransferRequest {
            meta: FileMeta {
                name: self.name.clone(),
                size: self.size,
                mime_type: self.mime_type.clone(),
            },
            source: self.source.clone(),
        }
    }

    pub(crate) fn set_status(&mut self, status: EntryStatus) {
        self.status = status;
    }

    pub(crate) fn set_progress(&mut self, progress: u8) {
        self.progress = progress;
    }

    pub(crate) fn set_thumbnail(&mut self, thumbnail: String) {
        self.thumbnail = Some(thumbnail);
    }
}

/// Lifecycle of an upload session. `Idle` means no session exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Uploading,
    Completed,
    Error,
}

/// One transfer run over the entries that were pending when it started.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub(crate) id: u64,
    pub(crate) status: SessionStatus,
    pub(crate) participants: Vec<EntryId>,
    pub(crate) total_files: usize,
    pub(crate) completed_files: usize,
    pub(crate) total_size: u64,
    pub(crate) uploaded_size: u64,
    pub(crate) started_at: Instant,
    pub(crate) started_at_utc: DateTime<Utc>,
}

impl UploadSession {
    pub(crate) fn new(id: u64, participants: &[&FileEntry]) -> Self {
        Self {
            id,
            status: SessionStatus::Uploading,
            participants: participants.iter().map(|e| e.id()).collect(),
            total_files: participants.len(),
            completed_files: 0,
            total_size: participants.iter().map(|e| e.size()).sum(),
            uploaded_size: 0,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Entries captured when the session started.
    pub fn participants(&self) -> &[EntryId] {
        &self.participants
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn completed_files(&self) -> usize {
        self.completed_files
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn uploaded_size(&self) -> u64 {
        self.uploaded_size
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at_utc
    }

    pub(crate) fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// State change published by the orchestrator for presentation.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    EntryAdded { id: EntryId },
    EntryUpdated { id: EntryId, status: EntryStatus, progress: u8 },
    ThumbnailReady { id: EntryId },
    EntryRemoved { id: EntryId },
    SessionUpdated(SessionSnapshot),
    SessionCleared,
}
