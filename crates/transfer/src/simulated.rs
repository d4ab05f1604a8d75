//! Stand-in backend that reads the source in equal steps with jittered delays.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::MAX_FILE_SIZE;
use crate::backend::{BackendError, FileMeta, ProgressSink, RemoteRecord, UploadBackend};
use crate::source::ByteSource;

/// Timing knobs for [`SimulatedBackend`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of equal progress steps per file.
    pub steps: u32,
    pub min_step_delay_ms: u64,
    pub max_step_delay_ms: u64,
    /// Chance per step of an extra stall, 0.0..=1.0.
    pub stall_probability: f64,
    pub stall_ms: u64,
    /// Delay after the last step before the record is returned.
    pub finalize_ms: u64,
    /// Prefix for the retrieval URL in returned records.
    pub base_url: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 20,
            min_step_delay_ms: 100,
            max_step_delay_ms: 300,
            stall_probability: 0.1,
            stall_ms: 500,
            finalize_ms: 300,
            base_url: "https://example.com/uploads".into(),
        }
    }
}

impl SimulationConfig {
    /// Same step count with every delay and stall removed.
    pub fn instant() -> Self {
        Self {
            min_step_delay_ms: 0,
            max_step_delay_ms: 0,
            stall_probability: 0.0,
            stall_ms: 0,
            finalize_ms: 0,
            ..Self::default()
        }
    }

    fn step_delay(&self) -> Duration {
        let lo = self.min_step_delay_ms.min(self.max_step_delay_ms);
        let hi = self.max_step_delay_ms.max(lo);
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }

    fn stalls(&self) -> bool {
        let p = self.stall_probability.clamp(0.0, 1.0);
        p > 0.0 && rand::thread_rng().gen_bool(p)
    }
}

/// Injected failure for a named file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePlan {
    /// 1-based step at which the transfer fails, before that step's progress
    /// is reported. 0 fails before any step.
    pub at_step: u32,
    pub cause: String,
}

impl FailurePlan {
    pub fn at_step(at_step: u32, cause: impl Into<String>) -> Self {
        Self {
            at_step,
            cause: cause.into(),
        }
    }
}

/// Backend that pretends to upload: it drains the source in `steps` equal
/// slices and reports `round(step / steps * 100)` after each one.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    config: SimulationConfig,
    failures: HashMap<String, FailurePlan>,
}

impl SimulatedBackend {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            failures: HashMap::new(),
        }
    }

    /// Makes every transfer of `file_name` fail as described by `plan`.
    pub fn with_failure(mut self, file_name: impl Into<String>, plan: FailurePlan) -> Self {
        self.failures.insert(file_name.into(), plan);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    async fn run(
        &self,
        source: &ByteSource,
        meta: &FileMeta,
        progress: ProgressSink,
    ) -> Result<RemoteRecord, BackendError> {
        if meta.size > MAX_FILE_SIZE {
            return Err(BackendError::new("File size exceeds 100MB limit"));
        }

        let steps = self.config.steps.max(1);
        let step_len = meta.size.div_ceil(u64::from(steps)).max(1);
        let failure = self.failures.get(&meta.name);

        let mut reader = source.open().await?;
        let mut scratch = Vec::new();

        for step in 1..=steps {
            tokio::time::sleep(self.config.step_delay()).await;

            if let Some(plan) = failure
                && step >= plan.at_step
            {
                debug!(file = %meta.name, step, cause = %plan.cause, "injected failure");
                return Err(BackendError::new(plan.cause.clone()));
            }

            let read = ByteSource::read_step(&mut *reader, step_len, &mut scratch).await?;
            trace!(file = %meta.name, step, bytes = read, "step sent");

            progress
                .report(f64::from(step) / f64::from(steps) * 100.0)
                .await;

            if self.config.stalls() {
                trace!(file = %meta.name, step, "network stall");
                tokio::time::sleep(Duration::from_millis(self.config.stall_ms)).await;
            }
        }

        tokio::time::sleep(Duration::from_millis(self.config.finalize_ms)).await;

        Ok(RemoteRecord {
            id: record_id(),
            filename: meta.name.clone(),
            size: meta.size,
            mime_type: meta.mime_type.clone(),
            url: format!("{}/{}", self.config.base_url.trim_end_matches('/'), meta.name),
            uploaded_at: Utc::now(),
        })
    }
}

impl UploadBackend for SimulatedBackend {
    fn upload_file<'a>(
        &'a self,
        source: &'a ByteSource,
        meta: &'a FileMeta,
        progress: ProgressSink,
    ) -> Pin<Box<dyn Future<Output = Result<RemoteRecord, BackendError>> + Send + 'a>> {
        Box::pin(self.run(source, meta, progress))
    }
}

/// `upload_<unix millis>_<9 random chars>`.
fn record_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("upload_{}_{suffix}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::executor::TransferEvent;

    fn meta(name: &str, size: u64) -> FileMeta {
        FileMeta {
            name: name.into(),
            size,
            mime_type: "text/plain".into(),
        }
    }

    async fn run(
        backend: &SimulatedBackend,
        source: ByteSource,
        meta: FileMeta,
    ) -> (Result<RemoteRecord, BackendError>, Vec<u8>) {
        let (tx, mut rx) = mpsc::channel(64);
        let result = backend
            .upload_file(&source, &meta, ProgressSink::new(tx))
            .await;
        let mut seen = Vec::new();
        while let Ok(TransferEvent::Progress(p)) = rx.try_recv() {
            seen.push(p);
        }
        (result, seen)
    }

    #[test]
    fn defaults_match_documented_timing() {
        let c = SimulationConfig::default();
        assert_eq!(c.steps, 20);
        assert_eq!((c.min_step_delay_ms, c.max_step_delay_ms), (100, 300));
        assert_eq!(c.stall_ms, 500);
        assert!((c.stall_probability - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn config_deserializes_partial_json() {
        let c: SimulationConfig =
            serde_json::from_str(r#"{"steps": 4, "base_url": "http://x"}"#).unwrap();
        assert_eq!(c.steps, 4);
        assert_eq!(c.base_url, "http://x");
        assert_eq!(c.finalize_ms, 300);
    }

    #[tokio::test]
    async fn reports_rounded_step_percentages() {
        let backend = SimulatedBackend::new(SimulationConfig {
            steps: 3,
            ..SimulationConfig::instant()
        });
        let (result, seen) = run(&backend, ByteSource::from(vec![1u8; 9]), meta("t.txt", 9)).await;
        assert!(result.is_ok());
        assert_eq!(seen, vec![33, 67, 100]);
    }

    #[tokio::test]
    async fn record_describes_the_file() {
        let backend = SimulatedBackend::new(SimulationConfig {
            base_url: "https://files.test/up/".into(),
            ..SimulationConfig::instant()
        });
        let (result, _) = run(&backend, ByteSource::from(b"abc".to_vec()), meta("doc.txt", 3)).await;
        let record = result.unwrap();
        assert_eq!(record.url, "https://files.test/up/doc.txt");
        assert_eq!(record.mime_type, "text/plain");
        assert!(record.id.starts_with("upload_"));
        assert_eq!(record.id.rsplit('_').next().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn unreadable_source_fails() {
        let backend = SimulatedBackend::new(SimulationConfig::instant());
        let (result, seen) = run(
            &backend,
            ByteSource::Path("/no/such/file.bin".into()),
            meta("file.bin", 10),
        )
        .await;
        assert!(result.is_err());
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn failure_at_step_zero_reports_nothing() {
        let backend = SimulatedBackend::new(SimulationConfig::instant())
            .with_failure("x.bin", FailurePlan::at_step(0, "refused"));
        let (result, seen) = run(&backend, ByteSource::from(vec![0u8; 4]), meta("x.bin", 4)).await;
        assert_eq!(result.unwrap_err().to_string(), "refused");
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn failure_only_hits_named_file() {
        let backend = SimulatedBackend::new(SimulationConfig::instant())
            .with_failure("x.bin", FailurePlan::at_step(10, "refused"));
        let (result, seen) = run(&backend, ByteSource::from(vec![0u8; 4]), meta("y.bin", 4)).await;
        assert!(result.is_ok());
        assert_eq!(seen.len(), 20);
    }
}
