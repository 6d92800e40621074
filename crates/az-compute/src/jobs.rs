//! Fixed-size pool executing the long-running provider calls that are
//! decoupled from their submitters. Submission never blocks; a saturated
//! pool queues jobs, it does not reject them.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error};

use crate::Result;

/// Terminal result of a pooled job, for anyone still holding the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
}

/// Receives lifecycle notifications for every pooled job. Observers are
/// diagnostics only and cannot influence execution.
pub trait JobObserver: Send + Sync + 'static {
    fn on_started(&self, label: &str);
    fn on_failed(&self, label: &str, error: &crate::Error);
    fn on_completed(&self, label: &str);
}

/// Default observer: structured log lines per lifecycle event.
pub struct LogObserver;

impl JobObserver for LogObserver {
    fn on_started(&self, label: &str) {
        debug!(job = label, "job started");
    }

    fn on_failed(&self, label: &str, error: &crate::Error) {
        error!(job = label, error = %error, "job failed");
    }

    fn on_completed(&self, label: &str) {
        debug!(job = label, "job completed");
    }
}

struct Job {
    label: String,
    work: BoxFuture<'static, Result<()>>,
    done: oneshot::Sender<JobOutcome>,
}

/// Completion handle for a submitted job. Dropping it is fine; jobs run
/// to completion whether or not anyone is watching.
pub struct JobHandle {
    done: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    /// Wait for the job to finish. `None` if the pool shut down before
    /// the job ran.
    pub async fn outcome(self) -> Option<JobOutcome> {
        self.done.await.ok()
    }
}

/// Fixed pool of workers draining one shared queue.
pub struct JobPool {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobPool {
    /// Pool with `workers` concurrent workers and the logging observer.
    /// Workers are spawned onto the current tokio runtime.
    pub fn new(workers: usize) -> Self {
        Self::with_observer(workers, Arc::new(LogObserver))
    }

    pub fn with_observer(workers: usize, observer: Arc<dyn JobObserver>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        for worker in 0..workers.max(1) {
            tokio::spawn(run_worker(worker, rx.clone(), observer.clone()));
        }
        Self { tx }
    }

    /// Queue a job under a diagnostic label and return at once. Failures
    /// inside the job are reported to the observer, never to the
    /// submitter.
    ///
    /// No ordering is promised between jobs, even jobs for the same
    /// machine; a caller that needs a create and a delete serialized
    /// must serialize them itself.
    pub fn submit<F>(&self, label: impl Into<String>, work: F) -> JobHandle
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job = Job {
            label: label.into(),
            work: work.boxed(),
            done: done_tx,
        };

        // Workers only disappear when the runtime shuts down; at that
        // point the job can only be dropped.
        if let Err(rejected) = self.tx.send(job) {
            error!(job = %rejected.0.label, "job pool has no workers, dropping job");
        }

        JobHandle { done: done_rx }
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    observer: Arc<dyn JobObserver>,
) {
    loop {
        // Hold the lock only while waiting for the next job, never while
        // running one.
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };

        observer.on_started(&job.label);
        let outcome = match job.work.await {
            Ok(()) => {
                observer.on_completed(&job.label);
                JobOutcome::Completed
            }
            Err(error) => {
                observer.on_failed(&job.label, &error);
                JobOutcome::Failed(error.to_string())
            }
        };
        let _ = job.done.send(outcome);
    }
    debug!(worker, "job worker exiting");
}
