//! # Host job scheduler contract.
//!
//! Jobs are addressed by name (periodic) or tag (one-shot). When a job fires,
//! the scheduler calls back into [`JobDispatch`](crate::workers::JobDispatch)
//! with the job's name.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SchedulerError;
use crate::policies::BackoffPolicy;

/// State of a scheduled job as reported by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Waiting for its next run.
    Enqueued,
    /// Currently running.
    Running,
    /// Waiting on constraints or prerequisites.
    Blocked,
    /// Finished successfully (one-shot only).
    Succeeded,
    /// Finished with a failure.
    Failed,
    /// Cancelled.
    Cancelled,
}

impl JobState {
    /// Returns `true` if the job will still run without being rescheduled.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Enqueued | JobState::Running | JobState::Blocked)
    }
}

/// Background job scheduler provided by the host.
#[async_trait]
pub trait ScheduledJobRunner: Send + Sync + 'static {
    /// Schedules a unique periodic job. With `replace_if_exists = false` an
    /// existing job of the same name is kept.
    async fn schedule_unique_periodic(
        &self,
        name: &str,
        interval: Duration,
        replace_if_exists: bool,
    ) -> Result<(), SchedulerError>;

    /// Schedules a one-shot job; re-runs after `backoff` while it asks for retry.
    async fn schedule_one_shot(&self, tag: &str, backoff: BackoffPolicy)
    -> Result<(), SchedulerError>;

    /// Cancels every pending job carrying `tag`.
    async fn cancel_by_tag(&self, tag: &str) -> Result<(), SchedulerError>;

    /// Returns the state of the job named `name`, `None` if unknown.
    async fn query_state(&self, name: &str) -> Result<Option<JobState>, SchedulerError>;
}
