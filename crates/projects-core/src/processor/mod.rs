//! Job processor — a worker pool whose jobs may submit more jobs.
//!
//! The amount of work is unknown up front: every directory job can fan out
//! into one job per subdirectory. Completion is detected by counting, not
//! by inspecting queues:
//!
//! - [`JobSubmitter::add_job`] sends `JobAdded` to the manager **before**
//!   enqueueing the job and before returning.
//! - A worker sends `JobFinished` only after the job body has returned.
//!
//! A job therefore registers every child it submits before its own
//! completion can be counted, so the pending count can only reach zero once
//! no job is queued or running. The manager thread is the only reader and
//! writer of that count.
//!
//! A processor is single use: after completion it rejects new jobs.
//!
//! ```ignore
//! let processor = JobProcessor::new();
//! processor.start_manager()?;
//! processor.start_workers(8)?;
//! processor.add_job(|| println!("hello"))?;
//! let report = processor.wait_for_completion()?;
//! ```
pub mod control;
pub mod error;
pub mod worker;

pub use control::{CompletionReport, ControlMessage};
pub use error::ProcessorError;
pub use worker::JobFault;

use control::ManagerParts;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};
use worker::WorkerParts;

/// A deferred unit of work, run exactly once by one worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle for submitting jobs, including from inside running jobs.
#[derive(Clone)]
pub struct JobSubmitter {
    control_tx: Sender<ControlMessage>,
    job_tx: Sender<Job>,
    completed: Arc<AtomicBool>,
    seeded: Arc<AtomicBool>,
}

impl JobSubmitter {
    /// Register and enqueue a job.
    ///
    /// The increment is handed to the manager before this returns. Calling
    /// this after the processor completed is a misuse and yields
    /// [`ProcessorError::Completed`]; a submission racing the completion
    /// event itself is not detected.
    pub fn add_job<F>(&self, job: F) -> Result<(), ProcessorError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.completed.load(Ordering::Acquire) {
            return Err(ProcessorError::Completed);
        }
        self.control_tx
            .send(ControlMessage::JobAdded)
            .map_err(|_| self.closed_error())?;
        self.seeded.store(true, Ordering::Release);
        self.job_tx
            .send(Box::new(job))
            .map_err(|_| self.closed_error())
    }

    fn closed_error(&self) -> ProcessorError {
        if self.completed.load(Ordering::Acquire) {
            ProcessorError::Completed
        } else {
            ProcessorError::ManagerStopped
        }
    }
}

/// Executor with dynamic job submission and exact completion detection.
pub struct JobProcessor {
    submitter: JobSubmitter,
    job_rx: Receiver<Job>,
    /// Taken by `start_manager`.
    manager: Mutex<Option<ManagerParts>>,
    shutdown_rx: Receiver<()>,
    completion_rx: Receiver<CompletionReport>,
    fault_tx: Sender<JobFault>,
    fault_rx: Receiver<JobFault>,
    fault_count: Arc<AtomicU64>,
    manager_started: AtomicBool,
    worker_count: AtomicUsize,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl JobProcessor {
    pub fn new() -> Self {
        let (control_tx, control_rx) = unbounded();
        let (job_tx, job_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let (completion_tx, completion_rx) = bounded(1);
        let (fault_tx, fault_rx) = unbounded();
        let completed = Arc::new(AtomicBool::new(false));

        Self {
            submitter: JobSubmitter {
                control_tx,
                job_tx,
                completed: Arc::clone(&completed),
                seeded: Arc::new(AtomicBool::new(false)),
            },
            job_rx,
            manager: Mutex::new(Some(ManagerParts {
                control_rx,
                shutdown_tx,
                completion_tx,
                completed,
            })),
            shutdown_rx,
            completion_rx,
            fault_tx,
            fault_rx,
            fault_count: Arc::new(AtomicU64::new(0)),
            manager_started: AtomicBool::new(false),
            worker_count: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// A handle that jobs can capture to submit follow-up work.
    pub fn submitter(&self) -> JobSubmitter {
        self.submitter.clone()
    }

    /// See [`JobSubmitter::add_job`].
    pub fn add_job<F>(&self, job: F) -> Result<(), ProcessorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submitter.add_job(job)
    }

    /// Receiver for faults raised by jobs. Every clone sees each fault once
    /// in total, not once per clone.
    pub fn faults(&self) -> Receiver<JobFault> {
        self.fault_rx.clone()
    }

    /// Launch the manager thread that owns the pending count.
    pub fn start_manager(&self) -> Result<(), ProcessorError> {
        let parts = self
            .manager
            .lock()
            .take()
            .ok_or(ProcessorError::ManagerAlreadyStarted)?;

        let handle = thread::Builder::new()
            .name("projects-manager".into())
            .spawn(move || control::run_manager(parts))
            .map_err(|source| ProcessorError::Spawn {
                role: "manager",
                source,
            })?;

        self.manager_started.store(true, Ordering::Release);
        self.threads.lock().push(handle);
        Ok(())
    }

    /// Launch `n` workers. May be called more than once to grow the pool.
    pub fn start_workers(&self, n: usize) -> Result<(), ProcessorError> {
        if n == 0 {
            return Err(ProcessorError::ZeroWorkers);
        }

        let mut threads = self.threads.lock();
        for _ in 0..n {
            let id = self.worker_count.fetch_add(1, Ordering::AcqRel);
            let parts = WorkerParts {
                id,
                job_rx: self.job_rx.clone(),
                shutdown_rx: self.shutdown_rx.clone(),
                control_tx: self.submitter.control_tx.clone(),
                fault_tx: self.fault_tx.clone(),
                fault_count: Arc::clone(&self.fault_count),
            };
            let handle = thread::Builder::new()
                .name(format!("projects-worker-{id}"))
                .spawn(move || worker::run_worker(parts))
                .map_err(|source| ProcessorError::Spawn {
                    role: "worker",
                    source,
                })?;
            threads.push(handle);
        }

        debug!(
            workers = self.worker_count.load(Ordering::Acquire),
            "Worker pool started"
        );
        Ok(())
    }

    /// Block until every submitted job, transitively, has finished.
    ///
    /// Joins the manager and worker threads before returning. A second call
    /// returns [`ProcessorError::Completed`].
    pub fn wait_for_completion(&self) -> Result<CompletionReport, ProcessorError> {
        if !self.manager_started.load(Ordering::Acquire)
            || self.worker_count.load(Ordering::Acquire) == 0
        {
            return Err(ProcessorError::NotStarted);
        }
        if !self.submitter.seeded.load(Ordering::Acquire) {
            return Err(ProcessorError::NoJobs);
        }

        let mut report = self
            .completion_rx
            .recv()
            .map_err(|_| self.submitter.closed_error())?;

        for handle in self.threads.lock().drain(..) {
            if handle.join().is_err() {
                warn!("Processor thread terminated by panic");
            }
        }

        report.faults = self.fault_count.load(Ordering::Acquire);
        Ok(report)
    }
}

impl Default for JobProcessor {
    fn default() -> Self {
        Self::new()
    }
}
