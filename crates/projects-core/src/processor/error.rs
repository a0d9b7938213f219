//! Errors raised by the job processor.
//!
//! None of these describe a failing job: job faults travel on the fault
//! side channel. These are lifecycle misuse or OS-level thread failures.
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The processor already signalled completion. Processors are single use.
    #[error("job processor has already completed; build a new processor for each scan")]
    Completed,

    #[error("job processor manager is already running")]
    ManagerAlreadyStarted,

    /// The manager went away before signalling completion.
    #[error("job processor manager stopped before completion")]
    ManagerStopped,

    /// Waiting without a manager or without workers would block forever.
    #[error("job processor needs a running manager and at least one worker")]
    NotStarted,

    /// Waiting before any job was submitted would block forever.
    #[error("no job was submitted to the processor")]
    NoJobs,

    #[error("worker pool size must be at least 1")]
    ZeroWorkers,

    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: io::Error,
    },
}
