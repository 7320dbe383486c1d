//! # One-shot retry jobs.
//!
//! Scheduling a one-shot job first cancels any pending one of the same
//! domain: the newest command's job supersedes older ones. When the job runs
//! while the app is backgrounded it waits `settle` before sweeping.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domains::Domain;
use crate::error::CoreError;
use crate::events::{EventKind, ObservabilitySink};
use crate::host::{LifecycleSignal, ScheduledJobRunner};
use crate::policies::BackoffPolicy;
use crate::workers::{JobKey, WorkResult};

/// Schedules and runs one-shot retry jobs.
pub struct OneShotRetry {
    scheduler: Arc<dyn ScheduledJobRunner>,
    lifecycle: Arc<dyn LifecycleSignal>,
    backoff: BackoffPolicy,
    settle: Duration,
    sink: Arc<dyn ObservabilitySink>,
}

impl OneShotRetry {
    pub fn new(
        scheduler: Arc<dyn ScheduledJobRunner>,
        lifecycle: Arc<dyn LifecycleSignal>,
        backoff: BackoffPolicy,
        settle: Duration,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            scheduler,
            lifecycle,
            backoff,
            settle,
            sink,
        }
    }

    /// Replaces `domain`'s pending one-shot job with a fresh one.
    pub async fn schedule(&self, domain: Domain) -> Result<(), CoreError> {
        let tag = JobKey::one_shot(domain).name();
        self.scheduler.cancel_by_tag(&tag).await?;
        self.scheduler.schedule_one_shot(&tag, self.backoff).await?;
        self.sink
            .report_event(&tag, EventKind::OneShotScheduled, "one-shot scheduled", &[]);
        Ok(())
    }

    /// Runs one pass of the job: settle if backgrounded, then `sweep`.
    pub async fn run<F, Fut>(&self, sweep: F) -> WorkResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if !self.lifecycle.is_foreground_now() {
            tokio::time::sleep(self.settle).await;
        }
        WorkResult::from(sweep().await)
    }
}
