//! Error taxonomy for the queue, supervisor, and track fan-out.
//!
//! Track and job errors never reach queue API callers; they end up as
//! `failed_tracks` and terminal job status. Only `QueueError` and
//! `ResolveError` are returned from submission calls.

use std::path::PathBuf;
use thiserror::Error;

/// Outcome of a single track unit that did not succeed.
#[derive(Debug, Error)]
pub enum TrackError {
    /// Fetching, writing, or annotating this track failed. Counted, never fatal to the job.
    #[error("track {track_id}: {source:#}")]
    Transient {
        track_id: u64,
        #[source]
        source: anyhow::Error,
    },
    /// The job was removed while this unit was pending or in flight.
    #[error("track {0}: canceled")]
    Canceled(u64),
}

impl TrackError {
    pub fn transient(track_id: u64, source: impl Into<anyhow::Error>) -> Self {
        TrackError::Transient {
            track_id,
            source: source.into(),
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, TrackError::Canceled(_))
    }
}

/// Job-level failure observed by the supervisor.
#[derive(Debug, Error)]
pub enum JobError {
    /// The session credential is no longer valid; the job is not started.
    #[error("credential is not valid for downloading, cannot continue")]
    CredentialInvalid,
    /// The job was removed by the caller.
    #[error("job canceled")]
    Canceled,
    /// Anything else that escaped job execution (including panics).
    #[error("unexpected job error: {0:#}")]
    Unexpected(#[source] anyhow::Error),
}

/// Submission-side errors.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,
}

/// A download request could not be turned into a job.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("not a catalog album reference: {0}")]
    UnsupportedReference(String),
    #[error("album {0} has no tracks")]
    EmptyAlbum(String),
    #[error("catalog lookup for album {reference} failed: {source:#}")]
    Catalog {
        reference: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors from the public service façade.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("delete downloaded data in {path}: {source:#}")]
    DeleteData {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_display_includes_track_and_cause() {
        let err = TrackError::transient(42, anyhow::anyhow!("connection reset"));
        assert_eq!(err.to_string(), "track 42: connection reset");
        assert!(!err.is_canceled());
        assert!(TrackError::Canceled(42).is_canceled());
    }

    #[test]
    fn service_error_wraps_queue_error() {
        let err: ServiceError = QueueError::Closed.into();
        assert_eq!(err.to_string(), "job queue is closed");
    }

    #[test]
    fn delete_data_names_the_folder() {
        let err = ServiceError::DeleteData {
            path: PathBuf::from("/music/A/B"),
            source: anyhow::anyhow!("permission denied"),
        };
        assert_eq!(
            err.to_string(),
            "delete downloaded data in /music/A/B: permission denied"
        );
    }
}
