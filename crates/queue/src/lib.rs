//! Upload queue: admission, per-file state, sessions and progress.
//!
//! The [`UploadOrchestrator`] owns everything mutable. Files are validated
//! and queued with [`add_files`](UploadOrchestrator::add_files), uploaded
//! together with [`start_upload`](UploadOrchestrator::start_upload), and
//! every state change is published as a [`QueueEvent`] for whatever is
//! rendering the queue.
//!
//! # Lifecycle
//!
//! 1. **Add**: validate, queue as pending, render thumbnails in the background
//! 2. **Upload**: snapshot pending files into a session, run one transfer each
//! 3. **Settle**: session is completed or failed; a completed one is cleared
//!    after a short linger

pub mod aggregator;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod thumbnail;
pub mod types;

pub use aggregator::{SessionSnapshot, aggregate, uploaded_bytes};
pub use config::QueueConfig;
pub use error::QueueError;
pub use orchestrator::{AddReport, EntryOutcome, UploadOrchestrator, UploadReport};
pub use registry::EntryRegistry;
pub use thumbnail::{
    THUMBNAIL_MAX_EDGE, ThumbnailError, generate_thumbnail, render_thumbnail, scaled_dimensions,
};
pub use types::{EntryId, EntryStatus, FileEntry, QueueEvent, SessionStatus, UploadSession};
