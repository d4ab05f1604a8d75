//! Per-file transfer: client-side validation, byte sources, the backend
//! interface and the executor task that drives one file through it.
//!
//! The executor reports progress as [`TransferEvent`]s on a channel rather
//! than through callbacks, so the consumer sees each file's events in order.

mod backend;
mod executor;
mod progress;
mod simulated;
mod source;
mod validation;

pub use backend::{BackendError, FileMeta, ProgressSink, RemoteRecord, UploadBackend};
pub use executor::{TransferEvent, TransferExecutor, TransferRequest, TransferTask};
pub use progress::{EtaBucket, format_eta, format_file_size, format_speed};
pub use simulated::{FailurePlan, SimulatedBackend, SimulationConfig};
pub use source::{ByteSource, RawFile};
pub use validation::{FileCategory, TypeFilter, ValidationError, file_extension, validate};

/// Largest file accepted for upload: 100 MiB.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// A failed transfer of a single file.
///
/// Whatever went wrong underneath (backend error, size re-check, cancelled
/// task) is flattened into one error carrying the cause's message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Upload failed: {cause}")]
pub struct TransferError {
    cause: String,
}

impl TransferError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }

    /// The underlying cause, without the `Upload failed:` prefix.
    pub fn cause(&self) -> &str {
        &self.cause
    }
}

impl From<BackendError> for TransferError {
    fn from(err: BackendError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_error_wraps_cause() {
        let err = TransferError::from(BackendError::new("connection reset"));
        assert_eq!(err.cause(), "connection reset");
        assert_eq!(err.to_string(), "Upload failed: connection reset");
    }
}
