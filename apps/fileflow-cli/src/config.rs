//! Optional JSON configuration for the CLI.

use std::path::Path;

use serde::Deserialize;

use fileflow_queue::QueueConfig;
use fileflow_transfer::SimulationConfig;

/// Contents of the `--config` file. Every section and field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub queue: QueueConfig,
    pub simulation: SimulationConfig,
}

impl CliConfig {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
