//! # LocalJobRunner: tokio-backed job scheduler.
//!
//! Runs periodic and one-shot jobs as tokio tasks for hosts without a
//! platform scheduler (and for tests). Jobs call back into the attached
//! [`JobDispatch`].
//!
//! ## Architecture
//! ```text
//! schedule_unique_periodic(name) ──► periodic loop:
//!                                      loop { sleep(interval) | cancelled → break
//!                                             Running → run_job → Enqueued }
//!
//! schedule_one_shot(tag, backoff) ──► one-shot loop:
//!                                      loop { cancelled? → break
//!                                             Running → run_job
//!                                               ├─ Success → Succeeded, exit
//!                                               └─ Retry   → Enqueued,
//!                                                  sleep(backoff.next(n)) | cancelled → break }
//! ```
//!
//! ## Rules
//! - One entry per name/tag; scheduling again replaces the previous job
//!   (periodic jobs only when `replace_if_exists` or when the old job is done)
//! - Cancellation is observed at safe points: before a run and during sleeps;
//!   a running `run_job` is never interrupted
//! - Every job holds a child token of the runner's root token

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::{select, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;
use crate::host::{JobState, ScheduledJobRunner};
use crate::policies::BackoffPolicy;
use crate::workers::{JobDispatch, JobKey, WorkResult};

/// Shared state of one scheduled job.
#[derive(Clone)]
struct JobStatus(Arc<Mutex<JobState>>);

impl JobStatus {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(JobState::Enqueued)))
    }

    fn get(&self) -> JobState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: JobState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

struct Entry {
    status: JobStatus,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl Entry {
    fn stop(&self) {
        self.cancel.cancel();
        if self.status.get().is_active() {
            self.status.set(JobState::Cancelled);
        }
    }
}

#[derive(Default)]
struct Inner {
    jobs: Mutex<HashMap<String, Entry>>,
    dispatch: RwLock<Option<Weak<dyn JobDispatch>>>,
    root: CancellationToken,
}

impl Inner {
    async fn dispatch(&self, key: JobKey) -> Option<WorkResult> {
        let target = self
            .dispatch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)?;
        Some(target.run_job(key).await)
    }
}

/// In-process [`ScheduledJobRunner`].
#[derive(Clone, Default)]
pub struct LocalJobRunner {
    inner: Arc<Inner>,
}

impl LocalJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes fired jobs to `dispatch`. Held weakly: jobs of a dropped
    /// dispatcher finish quietly.
    pub fn attach(&self, dispatch: Weak<dyn JobDispatch>) {
        *self
            .inner
            .dispatch
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(dispatch);
    }

    /// Number of jobs that will still run.
    pub fn active_jobs(&self) -> usize {
        self.inner
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| e.status.get().is_active())
            .count()
    }

    /// Cancels every job.
    pub fn shutdown(&self) {
        self.inner.root.cancel();
        let jobs = self.inner.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in jobs.values() {
            entry.stop();
        }
    }

    fn key(name: &str) -> Result<JobKey, SchedulerError> {
        JobKey::parse(name).ok_or_else(|| SchedulerError::Rejected {
            name: name.to_string(),
            reason: "unknown job name".into(),
        })
    }

    fn insert(&self, name: &str, status: JobStatus, cancel: CancellationToken, join: JoinHandle<()>) {
        let mut jobs = self.inner.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = jobs.insert(name.to_string(), Entry { status, cancel, join }) {
            old.stop();
            tracing::trace!(target: "pushvisor", job = name, finished = old.join.is_finished(), "job replaced");
        }
    }
}

async fn periodic_loop(
    inner: Arc<Inner>,
    key: JobKey,
    interval: Duration,
    status: JobStatus,
    cancel: CancellationToken,
) {
    loop {
        select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        status.set(JobState::Running);
        if inner.dispatch(key).await.is_none() {
            break;
        }
        if cancel.is_cancelled() {
            break;
        }
        status.set(JobState::Enqueued);
    }
    status.set(JobState::Cancelled);
}

async fn one_shot_loop(
    inner: Arc<Inner>,
    key: JobKey,
    backoff: BackoffPolicy,
    status: JobStatus,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            status.set(JobState::Cancelled);
            return;
        }
        status.set(JobState::Running);
        match inner.dispatch(key).await {
            None | Some(WorkResult::Success) => {
                status.set(JobState::Succeeded);
                return;
            }
            Some(WorkResult::Retry) => {}
        }
        status.set(JobState::Enqueued);

        let delay = backoff.next(attempt);
        attempt = attempt.saturating_add(1);
        tracing::debug!(target: "pushvisor", job = %key, attempt, delay_ms = delay.as_millis() as u64, "one-shot backoff");
        select! {
            _ = cancel.cancelled() => {
                status.set(JobState::Cancelled);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[async_trait]
impl ScheduledJobRunner for LocalJobRunner {
    async fn schedule_unique_periodic(
        &self,
        name: &str,
        interval: Duration,
        replace_if_exists: bool,
    ) -> Result<(), SchedulerError> {
        if self.inner.root.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        let key = Self::key(name)?;
        if interval.is_zero() {
            return Err(SchedulerError::Rejected {
                name: name.to_string(),
                reason: "zero interval".into(),
            });
        }
        if !replace_if_exists && self.query_state(name).await?.is_some_and(|s| s.is_active()) {
            return Ok(());
        }

        let status = JobStatus::new();
        let cancel = self.inner.root.child_token();
        let join = tokio::spawn(periodic_loop(
            self.inner.clone(),
            key,
            interval,
            status.clone(),
            cancel.clone(),
        ));
        self.insert(name, status, cancel, join);
        Ok(())
    }

    async fn schedule_one_shot(&self, tag: &str, backoff: BackoffPolicy) -> Result<(), SchedulerError> {
        if self.inner.root.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        let key = Self::key(tag)?;

        let status = JobStatus::new();
        let cancel = self.inner.root.child_token();
        let join = tokio::spawn(one_shot_loop(
            self.inner.clone(),
            key,
            backoff,
            status.clone(),
            cancel.clone(),
        ));
        self.insert(tag, status, cancel, join);
        Ok(())
    }

    async fn cancel_by_tag(&self, tag: &str) -> Result<(), SchedulerError> {
        let jobs = self.inner.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = jobs.get(tag) {
            entry.stop();
        }
        Ok(())
    }

    async fn query_state(&self, name: &str) -> Result<Option<JobState>, SchedulerError> {
        Ok(self
            .inner
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|e| e.status.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::Domain;
    use crate::policies::JitterPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        runs: AtomicUsize,
        retries: usize,
    }

    #[async_trait]
    impl JobDispatch for Counting {
        async fn run_job(&self, _key: JobKey) -> WorkResult {
            let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            WorkResult::from(n <= self.retries)
        }
    }

    fn runner(retries: usize) -> (LocalJobRunner, Arc<Counting>) {
        let dispatch = Arc::new(Counting {
            runs: AtomicUsize::new(0),
            retries,
        });
        let runner = LocalJobRunner::new();
        let weak: Weak<dyn JobDispatch> = Arc::downgrade(&(dispatch.clone() as Arc<dyn JobDispatch>));
        runner.attach(weak);
        (runner, dispatch)
    }

    fn backoff() -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_retries_with_backoff_until_success() {
        let (runner, dispatch) = runner(2);
        let tag = JobKey::one_shot(Domain::Subscription).name();
        runner.schedule_one_shot(&tag, backoff()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(dispatch.runs.load(Ordering::SeqCst), 1);
        assert_eq!(runner.query_state(&tag).await.unwrap(), Some(JobState::Enqueued));

        // 10s then 20s of backoff.
        tokio::time::sleep(Duration::from_secs(34)).await;
        assert_eq!(dispatch.runs.load(Ordering::SeqCst), 3);
        assert_eq!(runner.query_state(&tag).await.unwrap(), Some(JobState::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_by_tag_stops_pending_retry() {
        let (runner, dispatch) = runner(usize::MAX);
        let tag = JobKey::one_shot(Domain::PushEvent).name();
        runner.schedule_one_shot(&tag, backoff()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        runner.cancel_by_tag(&tag).await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(dispatch.runs.load(Ordering::SeqCst), 1);
        assert_eq!(runner.query_state(&tag).await.unwrap(), Some(JobState::Cancelled));
        assert_eq!(runner.active_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_ticks_and_is_not_duplicated() {
        let (runner, dispatch) = runner(0);
        let name = JobKey::periodic(Domain::MobileEvent).name();
        let every = Duration::from_secs(60);

        runner.schedule_unique_periodic(&name, every, false).await.unwrap();
        runner.schedule_unique_periodic(&name, every, false).await.unwrap();
        assert_eq!(runner.active_jobs(), 1);

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(dispatch.runs.load(Ordering::SeqCst), 2);

        assert!(runner.schedule_unique_periodic("bogus", every, false).await.is_err());
        runner.shutdown();
        assert!(runner.schedule_one_shot(&name, backoff()).await.is_err());
    }
}
