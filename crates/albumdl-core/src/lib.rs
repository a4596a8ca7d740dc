pub mod config;
pub mod logging;

pub mod catalog;
pub mod error;
pub mod job;
pub mod layout;
pub mod lyrics;
pub mod queue;
pub mod service;
pub mod sink;
pub mod status;
pub mod supervisor;

pub use error::{JobError, QueueError, ResolveError, ServiceError, TrackError};
pub use job::{Job, JobId, JobSnapshot, JobStatus};
pub use service::DownloadService;
