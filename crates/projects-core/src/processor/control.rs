//! The manager: sole owner of the pending-job count.
//!
//! Every submitter and worker talks to the manager through one control
//! channel. Because only the manager thread ever touches the count, it is
//! a plain integer and needs no lock. Message order across senders is
//! irrelevant, only the net sum is.
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Count mutations sent to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// A job was submitted. Sent before the job itself is enqueued.
    JobAdded,
    /// A worker finished running a job, successfully or not.
    JobFinished,
}

/// Totals observed by the manager up to the completion event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionReport {
    pub jobs_added: u64,
    pub jobs_finished: u64,
    /// Jobs that panicked. Filled in by the processor, not the manager.
    pub faults: u64,
}

impl CompletionReport {
    /// Increments minus decrements. Zero for every completed run.
    pub fn net_pending(&self) -> i64 {
        self.jobs_added as i64 - self.jobs_finished as i64
    }
}

/// Everything the manager thread takes ownership of when it starts.
pub(crate) struct ManagerParts {
    pub control_rx: Receiver<ControlMessage>,
    /// Dropped at completion; disconnecting it releases every worker.
    pub shutdown_tx: Sender<()>,
    pub completion_tx: Sender<CompletionReport>,
    pub completed: Arc<AtomicBool>,
}

/// Consume control messages until the pending count drops to zero or below.
///
/// Completion fires at most once: the loop is left on the first
/// zero-crossing and the thread exits, so no later message is ever read.
pub(crate) fn run_manager(parts: ManagerParts) {
    let ManagerParts {
        control_rx,
        shutdown_tx,
        completion_tx,
        completed,
    } = parts;

    let mut pending: i64 = 0;
    let mut report = CompletionReport::default();
    let mut reached_zero = false;

    for msg in control_rx.iter() {
        match msg {
            ControlMessage::JobAdded => {
                pending += 1;
                report.jobs_added += 1;
            }
            ControlMessage::JobFinished => {
                pending -= 1;
                report.jobs_finished += 1;
                if pending <= 0 {
                    reached_zero = true;
                    break;
                }
            }
        }
        trace!(pending, "Control message applied");
    }

    if !reached_zero {
        // Every sender hung up first: the processor was dropped mid-run.
        debug!(pending, "Control channel closed before completion");
        return;
    }

    completed.store(true, Ordering::Release);
    drop(shutdown_tx);
    debug!(
        jobs = report.jobs_added,
        "All jobs finished, closing job input"
    );
    let _ = completion_tx.send(report);
}
