//! `DownloadService`: the surface host applications talk to.
//!
//! Owns the queue, the execution context, and the supervisor task. Requests
//! are resolved into jobs before they are queued, so a bad reference or a
//! catalog failure is returned to the caller instead of becoming a job.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::DownloadRequest;
use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::job::{Collaborators, ExecContext, ExecSettings, Job, JobId, JobStatus};
use crate::queue::JobQueue;
use crate::status::{self, QueueEntry};
use crate::supervisor::{Supervisor, SupervisorSettings};

pub struct DownloadService {
    queue: Arc<JobQueue>,
    ctx: Arc<ExecContext>,
    supervisor_settings: SupervisorSettings,
    shutdown: CancellationToken,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadService {
    /// Builds a service from config; tracks land under `download_dir`.
    pub fn new(cfg: &AppConfig, download_dir: PathBuf, collaborators: Collaborators) -> Self {
        Self::with_settings(
            cfg.queue_capacity,
            ExecSettings::from_config(cfg, download_dir),
            SupervisorSettings::from_config(cfg),
            collaborators,
        )
    }

    pub fn with_settings(
        queue_capacity: usize,
        exec: ExecSettings,
        supervisor: SupervisorSettings,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            queue: Arc::new(JobQueue::new(queue_capacity)),
            ctx: Arc::new(ExecContext::new(collaborators, exec)),
            supervisor_settings: supervisor,
            shutdown: CancellationToken::new(),
            supervisor: Mutex::new(None),
        }
    }

    /// Spawns the supervisor on the current runtime. Calling it again is a no-op.
    pub fn start(&self) {
        let mut handle = self.supervisor.lock().unwrap_or_else(|e| e.into_inner());
        if handle.is_some() || self.shutdown.is_cancelled() {
            return;
        }
        let supervisor = Supervisor::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.ctx),
            self.supervisor_settings.clone(),
        );
        *handle = Some(supervisor.spawn(self.shutdown.clone()));
    }

    /// Resolves `request` and queues the job, waiting while the queue is full.
    pub async fn enqueue(&self, request: &DownloadRequest) -> Result<JobId, ServiceError> {
        let job = Job::resolve(self.ctx.collaborators.catalog.as_ref(), request).await?;
        Ok(self.queue.enqueue(job).await?)
    }

    /// Ordered snapshot of every tracked job.
    pub fn list_jobs(&self) -> Vec<QueueEntry> {
        status::get_queue(&self.queue)
    }

    /// Stops tracking the job and cancels it if active. Unknown ids are ignored.
    pub fn remove_job(&self, id: &str) {
        self.queue.remove_job(id);
    }

    /// Live handle to a tracked job.
    pub fn job(&self, id: &str) -> Option<Arc<Job>> {
        self.queue.get(id)
    }

    /// `remove_job`, then deletes the album folder the job wrote into.
    ///
    /// A running job is awaited first so no track unit is still writing. Jobs
    /// that never started have no folder. A folder that is the download root
    /// itself, or lies outside it, is left alone.
    pub async fn remove_job_and_data(&self, id: &str) -> Result<(), ServiceError> {
        let Some(job) = self.queue.get(id) else {
            return Ok(());
        };
        self.queue.remove_job(id);
        if job.status() == JobStatus::Downloading {
            job.wait_terminal().await;
        }
        let Some(folder) = job.download_folder() else {
            return Ok(());
        };
        let root = &self.ctx.settings.download_dir;
        if folder == root.as_path() || !folder.starts_with(root) {
            tracing::warn!(
                "job {}: not deleting {} (not an album folder under {})",
                id,
                folder.display(),
                root.display()
            );
            return Ok(());
        }
        self.ctx
            .collaborators
            .sink
            .remove_dir_all(folder)
            .await
            .map_err(|source| ServiceError::DeleteData {
                path: folder.to_path_buf(),
                source,
            })?;
        tracing::info!("job {}: deleted {}", id, folder.display());
        Ok(())
    }

    /// Stops accepting jobs, then waits for running jobs to finish.
    pub async fn shutdown(&self) {
        self.queue.close();
        self.shutdown.cancel();
        let handle = self
            .supervisor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("supervisor task: {}", e);
            }
        }
    }
}
