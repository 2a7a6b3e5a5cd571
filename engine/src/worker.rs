//! Background execution.
//!
//! Runs a whole job on its own thread so a caller (a UI event loop, say)
//! stays responsive. The worker still processes one candidate at a time.
//! Updates travel over an unbounded channel, so sending never blocks the
//! worker on a slow consumer.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::debug;

use crate::config::SortOptions;
use crate::error::EngineError;
use crate::job::{create_job, plan_job, run_job};
use crate::model::{CancelToken, OutcomeRecord, RunSummary, SortJob};
use crate::progress::ProgressCallback;

/// An update from a background run.
#[derive(Debug)]
pub enum RunEvent {
    /// Planning finished; `total` candidates will be processed
    Started { total: usize },
    /// One candidate was processed
    Outcome(OutcomeRecord),
    /// The run ended, normally or by cancellation
    Finished(RunSummary),
    /// The job could not be created or planned; no outcomes follow
    SetupFailed(EngineError),
}

/// A ProgressCallback implementation that forwards updates over a channel.
pub struct ChannelProgress {
    sender: Sender<RunEvent>,
}

impl ChannelProgress {
    pub fn new(sender: Sender<RunEvent>) -> Self {
        ChannelProgress { sender }
    }
}

impl ProgressCallback for ChannelProgress {
    fn on_run_started(&self, job: &SortJob) {
        let _ = self.sender.send(RunEvent::Started { total: job.total() });
    }

    fn on_candidate_completed(&self, _job: &SortJob, record: &OutcomeRecord) {
        let _ = self.sender.send(RunEvent::Outcome(record.clone()));
    }

    fn on_run_completed(&self, _job: &SortJob, summary: &RunSummary) {
        let _ = self.sender.send(RunEvent::Finished(*summary));
    }
}

/// Handle to a run executing on a background thread.
pub struct RunHandle {
    events: Receiver<RunEvent>,
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

impl RunHandle {
    /// Channel of updates; disconnects once the worker is done.
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    /// Ask the worker to stop before its next candidate.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker thread to exit.
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}

/// Spawn a background worker thread that creates, plans and runs a job.
pub fn spawn_run(input_root: PathBuf, output_root: PathBuf, options: SortOptions) -> RunHandle {
    let (tx, rx) = unbounded::<RunEvent>();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let thread = thread::spawn(move || {
        let prepared = create_job(&input_root, &output_root, options).and_then(|mut job| {
            plan_job(&mut job)?;
            Ok(job)
        });

        let mut job = match prepared {
            Ok(job) => job,
            Err(e) => {
                let _ = tx.send(RunEvent::SetupFailed(e));
                return;
            }
        };
        job.set_cancel_token(worker_cancel);

        let progress = ChannelProgress::new(tx);
        // The job is Planned here, so run_job cannot fail on state
        if let Err(e) = run_job(&mut job, Some(&progress)) {
            let _ = progress.sender.send(RunEvent::SetupFailed(e));
        }
        debug!(run_id = %job.id, "Background run exited");
    });

    RunHandle {
        events: rx,
        cancel,
        thread,
    }
}
