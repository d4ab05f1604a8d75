//! FileFlow CLI entry point.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use fileflow_notify::{ToastNotifier, ToastType};
use fileflow_queue::{EntryStatus, QueueEvent, UploadOrchestrator};
use fileflow_transfer::{
    FailurePlan, FileCategory, RawFile, SimulatedBackend, TypeFilter, file_extension, format_eta,
    format_file_size, format_speed,
};

use config::CliConfig;

#[derive(Parser)]
#[command(name = "fileflow")]
#[command(about = "Queue files and upload them against a simulated backend")]
struct Cli {
    /// Files to upload.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON file with `queue` and `simulation` sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Accept only one family of file types. Overrides the configured list.
    #[arg(long, value_enum)]
    filter: Option<FilterArg>,

    /// Limit how many files upload at once.
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Make a file fail, as `NAME` or `NAME:STEP`.
    #[arg(long = "fail", value_name = "NAME[:STEP]")]
    failures: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Images,
    Documents,
    Media,
}

impl From<FilterArg> for TypeFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => TypeFilter::All,
            FilterArg::Images => TypeFilter::Images,
            FilterArg::Documents => TypeFilter::Documents,
            FilterArg::Media => TypeFilter::Media,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fileflow=debug")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => CliConfig::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            CliConfig::default()
        }),
        None => CliConfig::default(),
    };
    if cli.max_concurrent.is_some() {
        cfg.queue.max_concurrent_transfers = cli.max_concurrent;
    }
    let allowed = match cli.filter {
        Some(filter) => {
            let filter = TypeFilter::from(filter);
            println!("Filter: {}", filter.label());
            filter.extensions()
        }
        None => cfg.queue.allowed_extensions.clone(),
    };

    let mut backend = SimulatedBackend::new(cfg.simulation.clone());
    for spec in &cli.failures {
        let (name, plan) = parse_failure(spec)?;
        backend = backend.with_failure(name, plan);
    }

    let notifier = Arc::new(ToastNotifier::new());
    let mut orch = UploadOrchestrator::new(cfg.queue, Arc::new(backend), notifier.clone());
    let Some(events) = orch.take_events() else {
        bail!("event stream already taken");
    };

    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        match RawFile::from_path(path, mime_for(path)).await {
            Ok(file) => files.push(file),
            Err(e) => eprintln!("skipping {}: {e}", path.display()),
        }
    }

    orch.add_files(files, &allowed).await;
    orch.thumbnails_settled().await;
    for entry in orch.entries().await {
        let category = FileCategory::from_mime(entry.mime_type());
        println!(
            "queued  {}  ({:?}, {}{})",
            entry.name(),
            category,
            format_file_size(entry.size()),
            if entry.thumbnail().is_some() { ", thumbnail" } else { "" },
        );
    }
    print_toasts(&notifier);

    let printer = tokio::spawn(print_events(events));
    let result = orch.start_upload().await;
    print_toasts(&notifier);

    // Dropping the orchestrator closes the event stream.
    drop(orch);
    if let Err(e) = printer.await {
        tracing::warn!("event printer failed: {e}");
    }

    let report = result?;
    println!();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(record) => println!("ok      {}  -> {}", outcome.name, record.url),
            Err(e) => println!("failed  {}  ({e})", outcome.name),
        }
    }

    if report.failed() > 0 {
        bail!("{} of {} file(s) failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}

async fn print_events(mut events: mpsc::Receiver<QueueEvent>) {
    let mut last_percent = None;
    while let Some(event) = events.recv().await {
        match event {
            QueueEvent::SessionUpdated(snapshot) => {
                if last_percent == Some(snapshot.percent) {
                    continue;
                }
                last_percent = Some(snapshot.percent);
                println!(
                    "[{:>3}%] {} / {}  {}  {}",
                    snapshot.percent,
                    format_file_size(snapshot.uploaded_size),
                    format_file_size(snapshot.total_size),
                    format_speed(snapshot.throughput.unwrap_or(0.0)),
                    format_eta(snapshot.eta),
                );
            }
            QueueEvent::EntryUpdated {
                id,
                status: EntryStatus::Completed | EntryStatus::Error,
                ..
            } => tracing::debug!(entry = %id, "entry settled"),
            _ => {}
        }
    }
}

fn print_toasts(notifier: &ToastNotifier) {
    for toast in notifier.drain() {
        let tag = match toast.toast_type {
            ToastType::Success => "success",
            ToastType::Error => "error",
            ToastType::Warning => "warning",
            ToastType::Info => "info",
        };
        println!("[{tag}] {}", toast.title);
    }
}

/// Parses `NAME` or `NAME:STEP`. A bare name fails halfway through.
fn parse_failure(spec: &str) -> anyhow::Result<(String, FailurePlan)> {
    let (name, step) = match spec.rsplit_once(':') {
        Some((name, step)) => (name, step.parse::<u32>()?),
        None => (spec, 10),
    };
    if name.is_empty() {
        bail!("empty file name in --fail {spec:?}");
    }
    Ok((name.to_string(), FailurePlan::at_step(step, "simulated network error")))
}

/// Best-effort MIME type from the file extension.
fn mime_for(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_extension(&name).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}
