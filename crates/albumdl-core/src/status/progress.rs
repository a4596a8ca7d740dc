//! Throughput and ETA for a running job.
//!
//! Rate is measured over the whole run: bytes_done / elapsed. ETA follows as
//! (total_bytes - bytes_done) / rate.

use std::time::Duration;

use crate::job::JobSnapshot;

#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes of finished tracks.
    pub bytes_done: u64,
    pub total_bytes: u64,
    /// Elapsed time since the job started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    pub fn from_snapshot(job: &JobSnapshot) -> Self {
        Self {
            bytes_done: job.downloaded_size,
            total_bytes: job.total_size,
            elapsed_secs: job.elapsed.map(|d| d.as_secs_f64()).unwrap_or(0.0),
        }
    }

    /// Bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated time remaining. None while nothing has finished yet, or when
    /// the estimate does not fit in a `Duration`.
    pub fn eta(&self) -> Option<Duration> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(remaining as f64 / rate).ok()
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}
