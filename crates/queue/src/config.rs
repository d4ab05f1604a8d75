//! Queue configuration.

use std::time::Duration;

use serde::Deserialize;

/// Tunables for an [`UploadOrchestrator`](crate::UploadOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Upper bound on simultaneous transfers. `None` dispatches every
    /// pending file at once.
    pub max_concurrent_transfers: Option<usize>,
    /// How long a completed session stays visible before it is cleared.
    pub completion_linger_ms: u64,
    /// Capacity of the [`QueueEvent`](crate::QueueEvent) channel.
    pub event_buffer: usize,
    /// Extensions accepted by `add_files`, without the dot. Empty accepts all.
    pub allowed_extensions: Vec<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: None,
            completion_linger_ms: 3_000,
            event_buffer: 64,
            allowed_extensions: Vec::new(),
        }
    }
}

impl QueueConfig {
    pub fn completion_linger(&self) -> Duration {
        Duration::from_millis(self.completion_linger_ms)
    }
}
