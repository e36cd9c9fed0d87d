pub mod cancel;
pub mod date;
pub mod error;
pub mod fs;
pub mod media;
pub mod pipeline;
pub mod provenance;
pub mod rename;
pub mod scan;
pub mod signature;
pub mod stats;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use cancel::CancellationToken;
pub use error::{AuditError, Result};
pub use pipeline::{FileOutcome, Pipeline, Step};
pub use provenance::Provenance;
pub use stats::{Counter, Stats, StatsSnapshot};

use date::exif::ExifDateProvider;
use date::provider::{CaptureDateProvider, ContainerDateProvider, DateTagger, NoTagger};
use date::quicktime::QuickTimeDateProvider;
use fs::{Filesystem, LocalFs};
use rename::RenamePlanner;

/// Default path length limit of the OS tagging provider (Windows MAX_PATH).
pub const DEFAULT_TAG_PATH_LIMIT: usize = 260;

fn default_tag_path_limit() -> usize {
    DEFAULT_TAG_PATH_LIMIT
}

/// Whether mutations are applied or only computed and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    #[default]
    Apply,
    Preview,
}

impl ExecutionMode {
    pub fn from_preview(preview: bool) -> Self {
        if preview {
            ExecutionMode::Preview
        } else {
            ExecutionMode::Apply
        }
    }

    pub fn applies(self) -> bool {
        self == ExecutionMode::Apply
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOptions {
    pub root: PathBuf,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Worker count; `None` uses one per available processing unit.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Progress interval in files; `None` uses max(100, 1% of total).
    #[serde(default)]
    pub progress_every: Option<u64>,
    #[serde(default = "default_tag_path_limit")]
    pub tag_path_limit: usize,
}

impl AuditOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            mode: ExecutionMode::Apply,
            workers: None,
            progress_every: None,
            tag_path_limit: DEFAULT_TAG_PATH_LIMIT,
        }
    }
}

/// Control options for a run.
#[derive(Debug, Clone, Default)]
pub struct AuditControl {
    pub cancel_token: Option<CancellationToken>,
}

impl AuditControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// External services the pipeline talks to. The defaults use the local filesystem,
/// EXIF for images and `mvhd` for containers, with no OS tagging.
pub struct Collaborators {
    pub fs: Box<dyn Filesystem>,
    pub capture: Box<dyn CaptureDateProvider>,
    pub container: Box<dyn ContainerDateProvider>,
    pub tagger: Box<dyn DateTagger>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            fs: Box::new(LocalFs),
            capture: Box::new(ExifDateProvider),
            container: Box::new(QuickTimeDateProvider),
            tagger: Box::new(NoTagger),
        }
    }
}

impl Collaborators {
    pub fn with_fs(mut self, fs: impl Filesystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn with_capture(mut self, provider: impl CaptureDateProvider + 'static) -> Self {
        self.capture = Box::new(provider);
        self
    }

    pub fn with_container(mut self, provider: impl ContainerDateProvider + 'static) -> Self {
        self.container = Box::new(provider);
        self
    }

    pub fn with_tagger(mut self, tagger: impl DateTagger + 'static) -> Self {
        self.tagger = Box::new(tagger);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub stage: String,
    pub current: u64,
    pub total: u64,
    pub message: String,
}

/// Type alias for progress callback
pub type ProgressCallback<'a> = dyn Fn(&Progress) + Send + Sync + 'a;

/// Count-based progress gate: passes the first 10 completions, every `every`-th
/// completion, and the last one.
pub struct ProgressGate<'a> {
    inner: &'a ProgressCallback<'a>,
    total: u64,
    every: u64,
}

impl<'a> ProgressGate<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>, total: u64, every: Option<u64>) -> Self {
        Self {
            inner,
            total,
            every: every.unwrap_or_else(|| Self::default_interval(total)).max(1),
        }
    }

    pub fn default_interval(total: u64) -> u64 {
        (total / 100).max(100)
    }

    /// `index` is zero-based.
    pub fn should_emit(&self, index: u64) -> bool {
        index < 10 || (index + 1) % self.every == 0 || index + 1 >= self.total
    }

    pub fn report(&self, index: u64, message: &str) {
        if self.should_emit(index) {
            (self.inner)(&Progress {
                stage: "audit".to_string(),
                current: index,
                total: self.total,
                message: message.to_string(),
            });
        }
    }
}

/// Result of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub mode: ExecutionMode,
    /// Files handed to the batch
    pub total: u64,
    pub counters: StatsSnapshot,
    #[serde(skip)]
    pub elapsed: Duration,
    /// Stopped early; `total - Processed` files were never dispatched
    pub cancelled: bool,
}

impl BatchReport {
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters.get(counter)
    }
}

/// Enumerate `options.root` and audit every supported file.
pub fn audit(options: &AuditOptions, progress_callback: &ProgressCallback<'_>) -> Result<BatchReport> {
    audit_with_control(
        options,
        &AuditControl::default(),
        &Collaborators::default(),
        progress_callback,
    )
}

/// Like [`audit`], with cancellation and custom collaborators.
pub fn audit_with_control(
    options: &AuditOptions,
    control: &AuditControl,
    collab: &Collaborators,
    progress_callback: &ProgressCallback<'_>,
) -> Result<BatchReport> {
    let paths = scan::enumerate(&options.root, options.recursive)?;
    info!(root = %options.root.display(), files = paths.len(), "enumerated media files");
    audit_paths(&paths, options, control, collab, progress_callback)
}

/// Audit an already enumerated list of files on a bounded worker pool.
///
/// Per-file failures never abort the batch. Cancellation stops dispatch of
/// further files; files in flight finish.
pub fn audit_paths(
    paths: &[PathBuf],
    options: &AuditOptions,
    control: &AuditControl,
    collab: &Collaborators,
    progress_callback: &ProgressCallback<'_>,
) -> Result<BatchReport> {
    let started = Instant::now();
    let total = paths.len() as u64;
    let stats = Stats::new();
    let planner = RenamePlanner::new();
    let gate = ProgressGate::new(progress_callback, total, options.progress_every);
    let completed = AtomicU64::new(0);
    let pipeline = Pipeline::new(collab, &planner, &stats, options.mode, options.tag_path_limit);

    // 0 lets rayon pick one thread per available processing unit
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.unwrap_or(0))
        .build()?;

    pool.install(|| {
        paths.par_iter().for_each(|path| {
            if control.is_cancelled() {
                return;
            }
            let outcome = pipeline.process(path);
            let index = completed.fetch_add(1, Ordering::Relaxed);
            gate.report(index, &outcome.summary());
        });
    });

    let report = BatchReport {
        mode: options.mode,
        total,
        counters: stats.snapshot(),
        elapsed: started.elapsed(),
        cancelled: control.is_cancelled(),
    };
    info!(
        processed = report.get(Counter::Processed),
        failed = report.get(Counter::Failed),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_gate_schedule() {
        let noop = |_: &Progress| {};
        let gate = ProgressGate::new(&noop, 1000, None);
        assert_eq!(ProgressGate::default_interval(1000), 100);
        assert_eq!(ProgressGate::default_interval(50_000), 500);
        assert!(gate.should_emit(0));
        assert!(gate.should_emit(9));
        assert!(!gate.should_emit(10));
        assert!(gate.should_emit(99));
        assert!(!gate.should_emit(100));
        assert!(gate.should_emit(999));
    }

    #[test]
    fn test_progress_gate_reports() {
        let seen = Mutex::new(Vec::new());
        let cb = |p: &Progress| seen.lock().unwrap().push(p.current);
        let gate = ProgressGate::new(&cb, 25, Some(5));
        for i in 0..25 {
            gate.report(i, "x");
        }
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 14, 19, 24]
        );
    }

    #[test]
    fn test_options_serde_defaults() {
        let opts: AuditOptions = serde_json::from_str(r#"{"root": "/media"}"#).unwrap();
        assert_eq!(opts.root, PathBuf::from("/media"));
        assert_eq!(opts.mode, ExecutionMode::Apply);
        assert_eq!(opts.tag_path_limit, DEFAULT_TAG_PATH_LIMIT);
        assert_eq!(opts.workers, None);
        assert!(!opts.recursive);

        let preview: AuditOptions =
            serde_json::from_str(r#"{"root": "/m", "mode": "Preview", "workers": 2}"#).unwrap();
        assert!(!preview.mode.applies());
        assert_eq!(preview.workers, Some(2));
    }

    #[test]
    fn test_execution_mode() {
        assert!(ExecutionMode::from_preview(false).applies());
        assert!(!ExecutionMode::from_preview(true).applies());
    }
}
