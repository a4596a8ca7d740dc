//! Album download job: immutable track list plus live progress and status.
//!
//! A `Job` is shared as `Arc<Job>` between the queue registry, the supervisor
//! and its own track units. Progress counters are atomics so pollers never
//! block execution; status lives in a `watch` channel so transitions are
//! checked in one place and callers can await the terminal state.

mod context;
mod execute;
mod track;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::catalog::{AlbumInfo, AlbumRef, Bitrate, CatalogClient, DownloadRequest, SessionValidator, TrackRef};
use crate::error::{JobError, ResolveError};

pub use context::{Collaborators, ExecContext, ExecSettings};
pub use execute::execute;

/// Opaque job identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Job state. Transitions only move forward: Queued → Downloading → Completed | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
}

impl JobStatus {
    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Downloading => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    pub fn can_advance_to(self, next: JobStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub struct Job {
    id: JobId,
    album: AlbumRef,
    title: String,
    artist: String,
    explicit: bool,
    bitrate: Bitrate,
    tracks: Vec<TrackRef>,
    total_size: u64,
    downloaded_size: AtomicU64,
    failed_tracks: AtomicU32,
    status: watch::Sender<JobStatus>,
    cancelled: AtomicBool,
    art_attempted: AtomicBool,
    download_folder: OnceLock<PathBuf>,
    started_at: OnceLock<Instant>,
    last_error: Mutex<Option<String>>,
    last_validity_check: Mutex<Option<Instant>>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("album", &self.album)
            .field("title", &self.title)
            .field("status", &self.status())
            .field("downloaded_size", &self.downloaded_size())
            .field("total_size", &self.total_size)
            .field("failed_tracks", &self.failed_tracks())
            .finish()
    }
}

impl Job {
    /// Builds a queued job from an already-resolved album.
    pub fn new(album: AlbumRef, bitrate: Bitrate, info: AlbumInfo) -> Self {
        let total_size = info
            .tracks
            .iter()
            .map(|t| t.size)
            .fold(0u64, u64::saturating_add);
        let (status, _) = watch::channel(JobStatus::Queued);
        Self {
            id: JobId::generate(),
            album,
            title: info.title,
            artist: info.artist,
            explicit: info.explicit,
            bitrate,
            tracks: info.tracks,
            total_size,
            downloaded_size: AtomicU64::new(0),
            failed_tracks: AtomicU32::new(0),
            status,
            cancelled: AtomicBool::new(false),
            art_attempted: AtomicBool::new(false),
            download_folder: OnceLock::new(),
            started_at: OnceLock::new(),
            last_error: Mutex::new(None),
            last_validity_check: Mutex::new(None),
        }
    }

    /// Parses the request, resolves the album through the catalog, and builds a queued job.
    pub async fn resolve(
        catalog: &dyn CatalogClient,
        request: &DownloadRequest,
    ) -> Result<Self, ResolveError> {
        let album = request.album()?;
        let bitrate = request.bitrate();
        let info = catalog
            .resolve_album(&album, bitrate)
            .await
            .map_err(|source| ResolveError::Catalog {
                reference: album.to_string(),
                source,
            })?;
        if info.tracks.is_empty() {
            return Err(ResolveError::EmptyAlbum(album.to_string()));
        }
        Ok(Self::new(album, bitrate, info))
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn album(&self) -> &AlbumRef {
        &self.album
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn explicit(&self) -> bool {
        self.explicit
    }

    pub fn bitrate(&self) -> Bitrate {
        self.bitrate
    }

    pub fn tracks(&self) -> &[TrackRef] {
        &self.tracks
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn downloaded_size(&self) -> u64 {
        self.downloaded_size.load(Ordering::Acquire)
    }

    pub fn failed_tracks(&self) -> u32 {
        self.failed_tracks.load(Ordering::Acquire)
    }

    pub fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    /// True when the job was removed while executing.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn download_folder(&self) -> Option<&Path> {
        self.download_folder.get().map(PathBuf::as_path)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Time since execution started; None while queued.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.get().map(|t| t.elapsed())
    }

    /// Moves the status forward. Returns false (and changes nothing) for
    /// backward or out-of-terminal transitions.
    pub(crate) fn advance(&self, next: JobStatus) -> bool {
        self.status.send_if_modified(|current| {
            if current.can_advance_to(next) {
                *current = next;
                true
            } else {
                false
            }
        })
    }

    /// Waits until the job reaches Completed or Failed.
    pub async fn wait_terminal(&self) -> JobStatus {
        let mut rx = self.status.subscribe();
        let reached = rx.wait_for(|s| s.is_terminal()).await.map(|s| *s);
        reached.unwrap_or_else(|_| self.status())
    }

    pub(crate) fn mark_started(&self) {
        let _ = self.started_at.set(Instant::now());
    }

    pub(crate) fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Credits one finished track. The running total never exceeds `total_size`.
    pub(crate) fn record_track_done(&self, size: u64) {
        let total = self.total_size;
        let _ = self
            .downloaded_size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |done| {
                Some(done.saturating_add(size).min(total))
            });
    }

    pub(crate) fn record_track_failed(&self) {
        self.failed_tracks.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn set_download_folder(&self, folder: &Path) {
        let _ = self.download_folder.set(folder.to_path_buf());
    }

    /// First caller wins; used so only one track unit fetches cover art.
    pub(crate) fn claim_art(&self) -> bool {
        !self.art_attempted.swap(true, Ordering::AcqRel)
    }

    /// Terminal status from the failure count.
    pub(crate) fn finish(&self) -> JobStatus {
        let next = if self.failed_tracks() > 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        self.advance(next);
        self.status()
    }

    /// Fails the job outright (credential problems, escaped errors).
    pub(crate) fn fail(&self, err: &JobError) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(err.to_string());
        self.advance(JobStatus::Failed);
    }

    /// Re-checks the session at most once per `interval` for this job. The first call always checks.
    pub async fn ensure_validity(
        &self,
        validator: &dyn SessionValidator,
        interval: Duration,
    ) -> Result<(), JobError> {
        let due = {
            let mut last = self
                .last_validity_check
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            match *last {
                Some(at) if at.elapsed() <= interval => false,
                _ => {
                    *last = Some(Instant::now());
                    true
                }
            }
        };
        if !due || validator.is_credential_valid().await {
            return Ok(());
        }
        Err(JobError::CredentialInvalid)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            album: self.album.to_string(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            explicit: self.explicit,
            bitrate: self.bitrate,
            track_count: self.tracks.len(),
            total_size: self.total_size,
            downloaded_size: self.downloaded_size(),
            failed_tracks: self.failed_tracks(),
            status: self.status(),
            cancelled: self.is_cancelled(),
            download_folder: self.download_folder().map(Path::to_path_buf),
            error: self.last_error(),
            elapsed: self.elapsed(),
        }
    }
}

/// Point-in-time copy of a job for callers; never aliases live state.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub album: String,
    pub title: String,
    pub artist: String,
    pub explicit: bool,
    pub bitrate: Bitrate,
    pub track_count: usize,
    pub total_size: u64,
    pub downloaded_size: u64,
    pub failed_tracks: u32,
    pub status: JobStatus,
    pub cancelled: bool,
    pub download_folder: Option<PathBuf>,
    pub error: Option<String>,
    #[serde(skip)]
    pub elapsed: Option<Duration>,
}

impl JobSnapshot {
    /// Display title in indexer style: `Artist - Title [WEB] FORMAT [Explicit]`.
    pub fn display_title(&self) -> String {
        let mut title = format!("{} - {} [WEB] {}", self.artist, self.title, self.bitrate);
        if self.explicit {
            title.push_str(" [Explicit]");
        }
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    pub(crate) fn album_job(sizes: &[u64]) -> Job {
        let tracks = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| TrackRef {
                id: i as u64 + 1,
                size,
            })
            .collect();
        Job::new(
            AlbumRef::new("1"),
            Bitrate::Flac,
            AlbumInfo {
                title: "Album".into(),
                artist: "Artist".into(),
                explicit: true,
                tracks,
            },
        )
    }

    struct CountingValidator {
        valid: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionValidator for CountingValidator {
        async fn is_credential_valid(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.valid
        }
    }

    #[test]
    fn total_size_is_sum_of_tracks() {
        let job = album_job(&[10, 20, 30]);
        assert_eq!(job.total_size(), 60);
        assert_eq!(job.status(), JobStatus::Queued);
        assert_eq!(job.downloaded_size(), 0);
        assert!(job.elapsed().is_none());
    }

    #[test]
    fn status_only_moves_forward() {
        let job = album_job(&[1]);
        assert!(job.advance(JobStatus::Downloading));
        assert!(!job.advance(JobStatus::Queued));
        assert!(!job.advance(JobStatus::Downloading));
        assert!(job.advance(JobStatus::Completed));
        assert!(!job.advance(JobStatus::Failed));
        assert_eq!(job.status(), JobStatus::Completed);
    }

    #[test]
    fn finish_follows_failure_count() {
        let ok = album_job(&[1, 2]);
        ok.advance(JobStatus::Downloading);
        assert_eq!(ok.finish(), JobStatus::Completed);

        let bad = album_job(&[1, 2]);
        bad.advance(JobStatus::Downloading);
        bad.record_track_failed();
        assert_eq!(bad.finish(), JobStatus::Failed);
        assert_eq!(bad.failed_tracks(), 1);
    }

    #[test]
    fn downloaded_size_is_capped_at_total() {
        let job = album_job(&[10, 20]);
        job.record_track_done(10);
        job.record_track_done(25);
        assert_eq!(job.downloaded_size(), 30);
    }

    #[test]
    fn snapshot_and_display_title() {
        let job = album_job(&[5]);
        job.set_download_folder(Path::new("/music/a"));
        job.set_download_folder(Path::new("/music/b"));
        let snap = job.snapshot();
        assert_eq!(snap.download_folder.as_deref(), Some(Path::new("/music/a")));
        assert_eq!(snap.display_title(), "Artist - Album [WEB] FLAC [Explicit]");
        assert_eq!(snap.track_count, 1);
    }

    #[test]
    fn art_is_claimed_once() {
        let job = album_job(&[5]);
        assert!(job.claim_art());
        assert!(!job.claim_art());
    }

    #[tokio::test]
    async fn fail_records_error_and_wait_terminal_returns() {
        let job = album_job(&[5]);
        job.fail(&JobError::CredentialInvalid);
        assert_eq!(job.wait_terminal().await, JobStatus::Failed);
        assert!(job.last_error().unwrap().contains("credential"));
    }

    #[tokio::test]
    async fn wait_terminal_wakes_on_finish() {
        let job = Arc::new(album_job(&[5]));
        let waiter = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.wait_terminal().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        job.advance(JobStatus::Downloading);
        job.record_track_done(5);
        assert_eq!(job.finish(), JobStatus::Completed);
        assert_eq!(waiter.await.unwrap(), JobStatus::Completed);
    }

    #[test]
    fn total_size_saturates_on_huge_tracks() {
        let job = album_job(&[u64::MAX, 10]);
        assert_eq!(job.total_size(), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn validity_checked_once_per_interval() {
        let job = album_job(&[5]);
        let validator = CountingValidator {
            valid: true,
            calls: AtomicUsize::new(0),
        };
        let interval = Duration::from_secs(30 * 60);
        job.ensure_validity(&validator, interval).await.unwrap();
        job.ensure_validity(&validator, interval).await.unwrap();
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(interval + Duration::from_secs(1)).await;
        job.ensure_validity(&validator, interval).await.unwrap();
        assert_eq!(validator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_credential_is_reported() {
        let job = album_job(&[5]);
        let validator = CountingValidator {
            valid: false,
            calls: AtomicUsize::new(0),
        };
        let err = job
            .ensure_validity(&validator, Duration::from_secs(1800))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::CredentialInvalid));
    }
}
