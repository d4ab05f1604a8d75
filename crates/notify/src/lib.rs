//! User-facing notifications for the upload queue.
//!
//! The queue only ever calls [`Notifier::notify`]; how a notification is
//! shown is up to the implementor. [`ToastNotifier`] collects them into a
//! [`ToastQueue`] for a UI (or a CLI) to drain.

mod toast;

use std::sync::Mutex;

use tracing::warn;

pub use toast::{Toast, ToastQueue, ToastType};

/// What happened, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// A selected file failed validation (type or size).
    FileRejected,
    /// One or more files joined the queue.
    FilesAdded,
    /// An upload was requested with nothing pending.
    NothingToUpload,
    /// Every file in the session uploaded.
    UploadSucceeded,
    /// At least one file in the session failed.
    UploadFailed,
    FileRemoved,
    CompletedCleared,
    QueueReset,
}

impl NotificationKind {
    /// Toast style used to present this kind.
    pub fn toast_type(self) -> ToastType {
        match self {
            Self::FileRejected | Self::UploadFailed => ToastType::Error,
            Self::NothingToUpload => ToastType::Warning,
            Self::FileRemoved => ToastType::Info,
            Self::FilesAdded
            | Self::UploadSucceeded
            | Self::CompletedCleared
            | Self::QueueReset => ToastType::Success,
        }
    }
}

/// Receives notifications from the upload queue.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Notifier that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _kind: NotificationKind, _message: &str) {}
}

/// Notifier backed by a [`ToastQueue`].
#[derive(Debug, Default)]
pub struct ToastNotifier {
    queue: Mutex<ToastQueue>,
}

impl ToastNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued toast, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        match self.queue.lock() {
            Ok(mut q) => q.drain(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of toasts waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl Notifier for ToastNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match self.queue.lock() {
            Ok(mut q) => {
                q.push_default(kind.toast_type(), message);
            }
            Err(e) => warn!("toast queue poisoned, dropping notification: {e}"),
        }
    }
}
