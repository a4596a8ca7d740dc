pub mod fake_catalog;

use albumdl_core::catalog::DownloadRequest;
use albumdl_core::job::{Collaborators, ExecSettings};
use albumdl_core::supervisor::SupervisorSettings;
use albumdl_core::{DownloadService, JobId, JobSnapshot};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use fake_catalog::FakeCatalog;

pub fn service(
    catalog: Arc<FakeCatalog>,
    dir: &Path,
    capacity: usize,
    max_jobs: usize,
    max_tracks: usize,
) -> DownloadService {
    service_with(Collaborators::new(catalog), dir, capacity, max_jobs, max_tracks)
}

pub fn service_with(
    collaborators: Collaborators,
    dir: &Path,
    capacity: usize,
    max_jobs: usize,
    max_tracks: usize,
) -> DownloadService {
    DownloadService::with_settings(
        capacity,
        ExecSettings {
            download_dir: dir.to_path_buf(),
            max_concurrent_tracks: max_tracks,
            ..ExecSettings::default()
        },
        SupervisorSettings {
            max_concurrent_jobs: max_jobs,
            ..SupervisorSettings::default()
        },
        collaborators,
    )
}

pub async fn enqueue_album(svc: &DownloadService, album: u64) -> JobId {
    svc.enqueue(&DownloadRequest::new(format!("album:{}", album)))
        .await
        .unwrap()
}

pub fn snapshot(svc: &DownloadService, id: &JobId) -> JobSnapshot {
    svc.job(id.as_str()).unwrap().snapshot()
}

/// Polls `cond` until it holds, failing the test after five seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
