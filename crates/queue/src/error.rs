//! Queue error types.

/// Reasons `start_upload` refuses to begin a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("no files to upload")]
    NoPendingFiles,

    #[error("an upload is already in progress")]
    UploadInProgress,
}
