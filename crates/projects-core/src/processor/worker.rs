//! Worker loop and fault isolation.
use super::control::ControlMessage;
use super::Job;
use crossbeam_channel::{select, Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// A job that panicked instead of returning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFault {
    /// Index of the worker that ran the job.
    pub worker: usize,
    /// Panic payload, when it was a string.
    pub message: String,
}

pub(crate) struct WorkerParts {
    pub id: usize,
    pub job_rx: Receiver<Job>,
    pub shutdown_rx: Receiver<()>,
    pub control_tx: Sender<ControlMessage>,
    pub fault_tx: Sender<JobFault>,
    pub fault_count: Arc<AtomicU64>,
}

/// Pull and run jobs until the manager closes job input.
///
/// `JobFinished` is sent for every job taken off the queue, including jobs
/// that panic, so the pending count always returns to zero.
pub(crate) fn run_worker(parts: WorkerParts) {
    let WorkerParts {
        id,
        job_rx,
        shutdown_rx,
        control_tx,
        fault_tx,
        fault_count,
    } = parts;

    loop {
        // A disconnected shutdown channel means the manager saw the final job finish.
        let next = select! {
            recv(job_rx) -> msg => msg.ok(),
            recv(shutdown_rx) -> _ => None,
        };
        let Some(job) = next else { break };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let message = panic_message(payload.as_ref());
            warn!(worker = id, %message, "Job panicked");
            fault_count.fetch_add(1, Ordering::Relaxed);
            let _ = fault_tx.send(JobFault { worker: id, message });
        }
        if control_tx.send(ControlMessage::JobFinished).is_err() {
            break;
        }
    }

    trace!(worker = id, "Worker exiting");
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let p = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "boom");

        let p = panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "code 7");

        let p = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "<non-string panic payload>");
    }
}
