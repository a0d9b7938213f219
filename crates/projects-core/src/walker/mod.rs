//! Directory walker — finds project roots beneath a search root.
//!
//! A directory is a project root when it directly contains the marker
//! entry (`.git` by default). The walker reports each project root once and
//! never looks inside it, so nested repositories (submodules, vendored
//! checkouts) are not reported separately.
//!
//! Each directory is one job on a [`JobProcessor`]. A job lists its
//! directory, reports children that carry the marker and submits one new
//! job for every other child directory. There is no recursion on the call
//! stack, so depth is limited only by memory.
//!
//! # Errors
//!
//! Only the root is load-bearing. If it cannot be resolved, [`DirectoryScanner::scan`]
//! fails before any job is submitted. A subdirectory that cannot be listed
//! is abandoned: the rest of the tree is still walked and the scan still
//! succeeds. Such soft errors are logged at `debug` and can be observed
//! through [`ScanOptions::on_soft_error`].
pub mod fs;

use crate::model::Match;
use crate::processor::worker::panic_message;
use crate::processor::{JobFault, JobProcessor, JobSubmitter, ProcessorError};
use fs::{FileSystem, OsFileSystem};
use parking_lot::Mutex;
use std::any::Any;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Marker entry that identifies a project root.
pub const DEFAULT_MARKER: &str = ".git";

/// Called for every directory that could not be listed.
pub type SoftErrorHandler = Arc<dyn Fn(&Path, &io::Error) + Send + Sync>;

/// Walker configuration.
#[derive(Clone)]
pub struct ScanOptions {
    /// Worker pool size. Always at least 1.
    pub workers: usize,
    /// Name of the entry whose presence marks a project root.
    pub marker: OsString,
    /// Observer for subtrees abandoned because their listing failed.
    pub on_soft_error: Option<SoftErrorHandler>,
}

impl ScanOptions {
    /// Set the worker pool size. A request for zero workers is clamped to
    /// one, since an empty pool could never finish the root job.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Use `marker` instead of [`DEFAULT_MARKER`]. Only the entry's
    /// existence matters, so a marker file counts as much as a directory.
    pub fn with_marker(mut self, marker: impl Into<OsString>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Register an observer for directories that could not be listed.
    ///
    /// The handler runs on worker threads while the scan is in flight and
    /// has no influence on the result. Without one, such failures are only
    /// counted and logged.
    pub fn on_soft_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Path, &io::Error) + Send + Sync + 'static,
    {
        self.on_soft_error = Some(Arc::new(handler));
        self
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            marker: OsString::from(DEFAULT_MARKER),
            on_soft_error: None,
        }
    }
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOptions")
            .field("workers", &self.workers)
            .field("marker", &self.marker)
            .field("on_soft_error", &self.on_soft_error.is_some())
            .finish()
    }
}

/// Errors that abort a scan. Subtree failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan root {} does not exist", path.display())]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scan root {} cannot be read: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scan root {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

impl ScanError {
    fn from_root_error(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            Self::RootNotFound { path, source }
        } else {
            Self::RootUnreadable { path, source }
        }
    }
}

/// A panic caught during a scan. The scan itself still completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFault {
    /// The callback panicked while handling the project root at `path`.
    /// The remaining children of its parent were still visited.
    Callback { path: PathBuf, message: String },
    /// A directory job panicked outside the callback, abandoning the rest
    /// of that directory.
    Job(JobFault),
}

impl fmt::Display for ScanFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback { path, message } => {
                write!(f, "callback panicked on {}: {message}", path.display())
            }
            Self::Job(fault) => {
                write!(f, "job on worker {} panicked: {}", fault.worker, fault.message)
            }
        }
    }
}

/// Counters for a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Directories whose listing succeeded.
    pub directories_listed: u64,
    /// Directories abandoned because their listing failed.
    pub soft_errors: u64,
    /// Project roots reported to the callback.
    pub matches: u64,
    /// Jobs registered with the processor (one per directory, root included).
    pub jobs_added: u64,
    /// Jobs the processor saw finish.
    pub jobs: u64,
    /// Every panic caught during the scan, callback panics first.
    pub faults: Vec<ScanFault>,
    pub duration: Duration,
}

impl ScanSummary {
    /// Registered minus finished jobs. Always zero for a completed scan.
    pub fn net_pending(&self) -> i64 {
        self.jobs_added as i64 - self.jobs as i64
    }
}

/// Walks one root. Cheap to build; every call to [`scan`](Self::scan)
/// uses a fresh job processor.
pub struct DirectoryScanner {
    root: PathBuf,
    options: ScanOptions,
    fs: Arc<dyn FileSystem>,
}

impl DirectoryScanner {
    /// Scanner for `root` with default options on the OS filesystem. The
    /// root is not checked until [`scan`](Self::scan) runs.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: ScanOptions::default(),
            fs: Arc::new(OsFileSystem),
        }
    }

    /// Replace the walker configuration.
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Walk through `fs` instead of the OS. Tests use this to run the walker
    /// over in-memory trees.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Walk the tree, invoking `callback` once per project root.
    ///
    /// `callback` runs on worker threads, possibly concurrently with itself,
    /// in no particular order. Blocks until the whole tree has been visited.
    /// A panicking callback is recorded in [`ScanSummary::faults`] and the
    /// walk carries on.
    pub fn scan<F>(&self, callback: F) -> Result<ScanSummary, ScanError>
    where
        F: Fn(Match) + Send + Sync + 'static,
    {
        let start = Instant::now();

        let meta = self
            .fs
            .metadata(&self.root)
            .map_err(|source| ScanError::from_root_error(&self.root, source))?;
        if !meta.is_dir {
            return Err(ScanError::NotADirectory {
                path: self.root.clone(),
            });
        }

        let workers = self.options.workers.max(1);
        info!(
            root = %self.root.display(),
            workers,
            marker = %self.options.marker.to_string_lossy(),
            "Starting project scan"
        );

        let processor = JobProcessor::new();
        processor.start_manager()?;
        processor.start_workers(workers)?;

        let walk = Arc::new(WalkContext {
            fs: Arc::clone(&self.fs),
            marker: self.options.marker.clone(),
            callback: Box::new(callback),
            on_soft_error: self.options.on_soft_error.clone(),
            submitter: processor.submitter(),
            directories_listed: AtomicU64::new(0),
            soft_errors: AtomicU64::new(0),
            matches: AtomicU64::new(0),
            faults: Mutex::new(Vec::new()),
        });

        let seed = Arc::clone(&walk);
        let root = self.root.clone();
        processor.add_job(move || scan_children(seed, root))?;

        let report = processor.wait_for_completion()?;

        let mut faults = std::mem::take(&mut *walk.faults.lock());
        faults.extend(processor.faults().try_iter().map(ScanFault::Job));

        let summary = ScanSummary {
            directories_listed: walk.directories_listed.load(Ordering::Acquire),
            soft_errors: walk.soft_errors.load(Ordering::Acquire),
            matches: walk.matches.load(Ordering::Acquire),
            jobs_added: report.jobs_added,
            jobs: report.jobs_finished,
            faults,
            duration: start.elapsed(),
        };

        info!(
            matches = summary.matches,
            directories = summary.directories_listed,
            soft_errors = summary.soft_errors,
            faults = summary.faults.len(),
            "Project scan complete in {:?}",
            summary.duration
        );
        Ok(summary)
    }
}

/// State shared by every job of one scan.
struct WalkContext {
    fs: Arc<dyn FileSystem>,
    marker: OsString,
    callback: Box<dyn Fn(Match) + Send + Sync>,
    on_soft_error: Option<SoftErrorHandler>,
    submitter: JobSubmitter,
    directories_listed: AtomicU64,
    soft_errors: AtomicU64,
    matches: AtomicU64,
    faults: Mutex<Vec<ScanFault>>,
}

impl WalkContext {
    fn soft_error(&self, dir: &Path, err: &io::Error) {
        self.soft_errors.fetch_add(1, Ordering::Relaxed);
        debug!(path = %dir.display(), error = %err, "Skipping unreadable directory");
        if let Some(handler) = &self.on_soft_error {
            handler(dir, err);
        }
    }

    fn report(&self, path: &Path) {
        self.matches.fetch_add(1, Ordering::Relaxed);
        let found = Match::from_path(path);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(found))) {
            self.callback_panicked(path, payload.as_ref());
        }
    }

    fn callback_panicked(&self, path: &Path, payload: &(dyn Any + Send)) {
        let message = panic_message(payload);
        warn!(path = %path.display(), %message, "Match callback panicked");
        self.faults.lock().push(ScanFault::Callback {
            path: path.to_path_buf(),
            message,
        });
    }
}

/// Job body: list `dir`, report project roots, queue everything else.
///
/// Child jobs are submitted before this returns, which is what keeps the
/// processor's pending count above zero while the subtree is still open.
fn scan_children(walk: Arc<WalkContext>, dir: PathBuf) {
    let entries = match walk.fs.read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            walk.soft_error(&dir, &err);
            return;
        }
    };
    walk.directories_listed.fetch_add(1, Ordering::Relaxed);

    for entry in entries {
        if !entry.is_dir {
            continue;
        }
        // The marker directory belongs to its parent; never walk into it.
        if entry.path.file_name() == Some(walk.marker.as_os_str()) {
            continue;
        }

        if walk.fs.exists(&entry.path.join(&walk.marker)) {
            walk.report(&entry.path);
            continue;
        }

        let child = Arc::clone(&walk);
        let path = entry.path;
        let submitted = walk.submitter.add_job(move || scan_children(child, path));
        if let Err(err) = submitted {
            // Only reachable if the processor completed while this job ran,
            // which the pending count rules out.
            error!(dir = %dir.display(), error = %err, "Failed to queue subdirectory");
        }
    }
}
