//! Caller-facing view of the queue: ordered snapshots with remaining-time estimates.

mod progress;

use serde::Serialize;
use std::time::Duration;

use crate::job::{JobSnapshot, JobStatus};
use crate::queue::JobQueue;

pub use progress::ProgressStats;

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    #[serde(flatten)]
    pub job: JobSnapshot,
    /// Display-only estimate; None when no rate is known yet.
    pub remaining: Option<Duration>,
}

/// Display group: finished jobs first, then running, then waiting.
fn display_rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Completed => 0,
        JobStatus::Failed => 1,
        JobStatus::Downloading => 2,
        JobStatus::Queued => 3,
    }
}

/// Snapshot of every tracked job, ordered for display.
pub fn get_queue(queue: &JobQueue) -> Vec<QueueEntry> {
    order_entries(queue.list_jobs())
}

/// Orders snapshots (already in submission order) and fills in estimates.
pub fn order_entries(mut jobs: Vec<JobSnapshot>) -> Vec<QueueEntry> {
    // Stable sort keeps submission order within each group.
    jobs.sort_by_key(|j| display_rank(j.status));
    let mut entries: Vec<QueueEntry> = jobs
        .into_iter()
        .map(|job| QueueEntry {
            job,
            remaining: None,
        })
        .collect();
    estimate_remaining(&mut entries);
    entries
}

/// Each Downloading job gets its own ETA. The first one with a measurable
/// rate also drives the estimate for everything queued behind it: every
/// Queued job adds `total_size / rate` on top of the job before it. Once the
/// running total overflows, the jobs behind it get no estimate.
fn estimate_remaining(entries: &mut [QueueEntry]) {
    let mut rate = None;
    let mut cumulative = None;

    for entry in entries.iter_mut() {
        match entry.job.status {
            JobStatus::Downloading => {
                let stats = ProgressStats::from_snapshot(&entry.job);
                entry.remaining = stats.eta();
                if rate.is_none() && stats.bytes_per_sec() > 0.0 {
                    rate = Some(stats.bytes_per_sec());
                    cumulative = entry.remaining;
                }
            }
            JobStatus::Queued => {
                if let Some(rate) = rate {
                    let own = Duration::try_from_secs_f64(entry.job.total_size as f64 / rate).ok();
                    cumulative = cumulative.zip(own).and_then(|(c, d)| c.checked_add(d));
                    entry.remaining = cumulative;
                }
            }
            JobStatus::Completed | JobStatus::Failed => {}
        }
    }
}
