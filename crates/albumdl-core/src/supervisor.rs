//! Supervisor loop: pulls jobs off the queue and runs up to J of them at once.
//!
//! Keeps up to `max_concurrent_jobs` jobs executing; a job slot is taken
//! before a job leaves Queued and released when its execution ends. Every
//! outcome of a job (success, failed tracks, credential problems, panics) is
//! recorded on the job itself; nothing a job does can stop the loop.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::JobError;
use crate::job::{execute, ExecContext, Job, JobId, JobStatus};
use crate::queue::{JobQueue, QueuedJob};

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Jobs executing at once (J). Values below 1 are treated as 1.
    pub max_concurrent_jobs: usize,
    /// Per-job minimum time between credential checks.
    pub validity_check_interval: Duration,
}

impl SupervisorSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            max_concurrent_jobs: cfg.max_concurrent_jobs,
            validity_check_interval: cfg.validity_check_interval(),
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Drops the job's cancel token from the registry when the job's task ends.
struct FinishGuard<'a> {
    queue: &'a JobQueue,
    id: JobId,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.queue.mark_finished(&self.id);
    }
}

pub struct Supervisor {
    queue: Arc<JobQueue>,
    ctx: Arc<ExecContext>,
    settings: SupervisorSettings,
}

impl Supervisor {
    pub fn new(queue: Arc<JobQueue>, ctx: Arc<ExecContext>, settings: SupervisorSettings) -> Self {
        Self {
            queue,
            ctx,
            settings,
        }
    }

    /// Runs the loop on the current runtime until `shutdown` fires or the queue closes.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Loop body. On shutdown, stops dequeuing and waits for running jobs to finish.
    /// Jobs still queued stay tracked as Queued.
    pub async fn run(self, shutdown: CancellationToken) {
        let max_jobs = self.settings.max_concurrent_jobs.max(1);
        let slots = Arc::new(Semaphore::new(max_jobs));
        let mut running = JoinSet::new();
        tracing::info!("supervisor started: {} concurrent jobs", max_jobs);

        loop {
            let queued = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    log_join(joined);
                    continue;
                }
                next = self.queue.dequeue() => match next {
                    Some(queued) => queued,
                    None => break,
                },
            };

            let slot = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!("shutdown while job {} waited for a slot", queued.job.id());
                    break;
                }
                slot = Arc::clone(&slots).acquire_owned() => match slot {
                    Ok(slot) => slot,
                    Err(_) => break,
                },
            };

            let QueuedJob { job, cancel } = queued;
            if cancel.is_cancelled() {
                tracing::debug!("job {} removed before start, skipping", job.id());
                continue;
            }

            let queue = Arc::clone(&self.queue);
            let ctx = Arc::clone(&self.ctx);
            let interval = self.settings.validity_check_interval;
            running.spawn(async move {
                let _slot = slot;
                let _finish = FinishGuard {
                    queue: &queue,
                    id: job.id().clone(),
                };
                run_guarded(job, ctx, cancel, interval).await;
            });
        }

        self.queue.close();
        if !running.is_empty() {
            tracing::info!("supervisor draining {} running jobs", running.len());
        }
        while let Some(joined) = running.join_next().await {
            log_join(joined);
        }
        tracing::info!("supervisor stopped");
    }
}

/// Pre-flight plus execution of one job. A panic anywhere inside marks the job Failed.
async fn run_guarded(
    job: Arc<Job>,
    ctx: Arc<ExecContext>,
    cancel: CancellationToken,
    validity_interval: Duration,
) {
    let outcome = AssertUnwindSafe(start_job(Arc::clone(&job), ctx, cancel, validity_interval))
        .catch_unwind()
        .await;
    let err = match outcome {
        Ok(Ok(_)) => return,
        Ok(Err(JobError::Canceled)) => {
            tracing::debug!("job {} removed during pre-flight", job.id());
            job.mark_cancelled();
            return;
        }
        Ok(Err(e)) => {
            tracing::warn!("job {} not started: {}", job.id(), e);
            e
        }
        Err(panic) => {
            let e = JobError::Unexpected(anyhow::anyhow!(panic_message(&*panic)));
            tracing::error!("job {} failed: {}", job.id(), e);
            e
        }
    };
    job.fail(&err);
}

async fn start_job(
    job: Arc<Job>,
    ctx: Arc<ExecContext>,
    cancel: CancellationToken,
    validity_interval: Duration,
) -> Result<JobStatus, JobError> {
    job.ensure_validity(ctx.collaborators.validator.as_ref(), validity_interval)
        .await?;
    if cancel.is_cancelled() {
        return Err(JobError::Canceled);
    }
    job.advance(JobStatus::Downloading);
    Ok(execute(job, ctx, cancel).await)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!("job task join: {}", e);
    }
}
