//! Per-job fan-out: every track is a unit, at most `max_concurrent_tracks` in flight.
//!
//! Units are spawned on a `JoinSet` and gated by a job-local semaphore. A unit
//! that has not yet acquired its slot when the job is cancelled never starts.
//! Failures are counted, never propagated; the terminal status is derived from
//! the failure count once every unit has finished.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::track::run_track_unit;
use super::{ExecContext, Job, JobStatus};
use crate::error::TrackError;

/// Executes all tracks of `job` and returns its terminal status.
///
/// The caller is expected to have moved the job to Downloading.
pub async fn execute(job: Arc<Job>, ctx: Arc<ExecContext>, cancel: CancellationToken) -> JobStatus {
    job.mark_started();
    let limit = Arc::new(Semaphore::new(ctx.settings.max_concurrent_tracks.max(1)));
    let mut units = JoinSet::new();

    tracing::info!(
        "job {} started: {} tracks, {} bytes",
        job.id(),
        job.tracks().len(),
        job.total_size()
    );

    for &track in job.tracks() {
        let job = Arc::clone(&job);
        let ctx = Arc::clone(&ctx);
        let cancel = cancel.clone();
        let limit = Arc::clone(&limit);
        units.spawn(async move {
            let _slot = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TrackError::Canceled(track.id)),
                slot = limit.acquire_owned() => slot.map_err(|e| TrackError::transient(track.id, e))?,
            };
            let outcome = run_track_unit(&job, &ctx, track, &cancel).await;
            match &outcome {
                Ok(()) => job.record_track_done(track.size),
                Err(TrackError::Canceled(_)) => {}
                Err(e) => {
                    job.record_track_failed();
                    tracing::warn!("job {} {}", job.id(), e);
                }
            }
            outcome
        });
    }

    let mut canceled_units = 0usize;
    while let Some(joined) = units.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_canceled() => canceled_units += 1,
            Ok(Err(_)) => {}
            Err(e) => {
                // A panicking unit counts as a failed track; siblings keep going.
                job.record_track_failed();
                tracing::error!("job {} track unit aborted: {}", job.id(), e);
            }
        }
    }

    if cancel.is_cancelled() {
        job.mark_cancelled();
        tracing::info!(
            "job {} canceled ({} tracks not finished)",
            job.id(),
            canceled_units
        );
    }

    let status = job.finish();
    tracing::info!(
        "job {} {}: {}/{} bytes, {} failed tracks",
        job.id(),
        status,
        job.downloaded_size(),
        job.total_size(),
        job.failed_tracks()
    );
    status
}
