//! Bounded FIFO job queue plus the registry of every tracked job.
//!
//! The channel carries jobs to the supervisor; the registry keeps them
//! listable (in submission order) from submission until removal. Each
//! registry entry holds the job's cancel token until the job finishes.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::job::{Job, JobId, JobSnapshot};

/// A job handed from the queue to the supervisor together with its cancel token.
pub(crate) struct QueuedJob {
    pub job: Arc<Job>,
    pub cancel: CancellationToken,
}

struct Entry {
    job: Arc<Job>,
    /// Dropped once the job reaches a terminal state.
    cancel: Option<CancellationToken>,
}

pub struct JobQueue {
    tx: mpsc::Sender<QueuedJob>,
    rx: Mutex<mpsc::Receiver<QueuedJob>>,
    /// Serializes submitters so registry order matches channel order.
    submit: Mutex<()>,
    registry: RwLock<Vec<Entry>>,
    closed: CancellationToken,
}

impl JobQueue {
    /// Creates a queue holding at most `capacity` jobs waiting for a worker (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
            submit: Mutex::new(()),
            registry: RwLock::new(Vec::new()),
            closed: CancellationToken::new(),
        }
    }

    fn entries(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends `job` to the tail of the queue, waiting while the queue is full.
    ///
    /// The job becomes visible in `list_jobs` only once it holds a slot. If
    /// this future is dropped while waiting, nothing is registered.
    pub async fn enqueue(&self, job: Job) -> Result<JobId, QueueError> {
        let _submit = self.submit.lock().await;
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        let slot = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(QueueError::Closed),
            slot = self.tx.reserve() => slot.map_err(|_| QueueError::Closed)?,
        };

        let job = Arc::new(job);
        let cancel = CancellationToken::new();
        let id = job.id().clone();
        self.entries_mut().push(Entry {
            job: Arc::clone(&job),
            cancel: Some(cancel.clone()),
        });
        slot.send(QueuedJob { job: Arc::clone(&job), cancel });

        tracing::info!(
            "job {} queued: {} - {} ({} tracks)",
            id,
            job.artist(),
            job.title(),
            job.tracks().len()
        );
        Ok(id)
    }

    /// Next job in FIFO order; None once the queue is closed.
    pub(crate) async fn dequeue(&self) -> Option<QueuedJob> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            next = rx.recv() => next,
        }
    }

    /// Stops tracking `id` and cancels it if still active. Unknown ids are ignored.
    /// Returns whether anything was removed.
    pub fn remove_job(&self, id: &str) -> bool {
        let removed = {
            let mut entries = self.entries_mut();
            let index = entries.iter().position(|e| e.job.id().as_str() == id);
            index.map(|i| entries.remove(i))
        };
        let Some(entry) = removed else {
            return false;
        };
        if let Some(cancel) = entry.cancel {
            cancel.cancel();
        }
        tracing::info!("job {} removed ({})", id, entry.job.status());
        true
    }

    /// Snapshots of every tracked job, in submission order.
    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.entries().iter().map(|e| e.job.snapshot()).collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.entries()
            .iter()
            .find(|e| e.job.id().as_str() == id)
            .map(|e| Arc::clone(&e.job))
    }

    /// Jobs still tracked (any status).
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuses further submissions and wakes blocked submitters and the supervisor.
    /// Jobs still in the channel stay tracked as Queued.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Drops the cancel token of a job that reached a terminal state.
    pub(crate) fn mark_finished(&self, id: &JobId) {
        if let Some(entry) = self.entries_mut().iter_mut().find(|e| e.job.id() == id) {
            entry.cancel = None;
        }
    }
}
