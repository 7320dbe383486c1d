//! # Periodic reconciliation.
//!
//! ```text
//! reconcile(domain):
//!   query_state(name) ─┬─ active (enqueued/running/blocked) ─► keep, no-op
//!                      ├─ finished / cancelled / failed     ─► schedule(replace = true)
//!                      └─ unknown                            ─► schedule(replace = false)
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::domains::Domain;
use crate::error::CoreError;
use crate::events::{EventKind, ObservabilitySink};
use crate::host::ScheduledJobRunner;
use crate::workers::JobKey;

/// Keeps every domain's periodic job scheduled exactly once.
pub struct PeriodicReconciler {
    scheduler: Arc<dyn ScheduledJobRunner>,
    interval: Duration,
    sink: Arc<dyn ObservabilitySink>,
}

impl PeriodicReconciler {
    pub fn new(
        scheduler: Arc<dyn ScheduledJobRunner>,
        interval: Duration,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            scheduler,
            interval,
            sink,
        }
    }

    /// (Re)starts `domain`'s periodic job unless it is active.
    ///
    /// Returns `true` if a schedule call was made.
    pub async fn reconcile(&self, domain: Domain) -> Result<bool, CoreError> {
        let name = JobKey::periodic(domain).name();
        let state = self.scheduler.query_state(&name).await?;
        if state.is_some_and(|s| s.is_active()) {
            return Ok(false);
        }

        self.scheduler
            .schedule_unique_periodic(&name, self.interval, state.is_some())
            .await?;
        self.sink
            .report_event(&name, EventKind::PeriodicScheduled, "periodic scheduled", &[]);
        Ok(true)
    }

    /// Reconciles each domain in `domains`, reporting failures.
    pub async fn reconcile_all(&self, domains: &[Domain]) {
        let runs = domains.iter().map(|d| async move {
            if let Err(err) = self.reconcile(*d).await {
                self.sink.report_error(d.as_str(), &err);
            }
        });
        futures::future::join_all(runs).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::host::JobState;
    use crate::workers::testing::Recording;

    fn reconciler() -> (PeriodicReconciler, Arc<Recording>) {
        let scheduler = Arc::new(Recording::default());
        let periodic = PeriodicReconciler::new(
            scheduler.clone(),
            Duration::from_secs(900),
            Arc::new(Bus::new(16)),
        );
        (periodic, scheduler)
    }

    #[tokio::test]
    async fn reconciling_twice_schedules_once() {
        let (periodic, scheduler) = reconciler();

        assert!(periodic.reconcile(Domain::MobileEvent).await.unwrap());
        assert!(!periodic.reconcile(Domain::MobileEvent).await.unwrap());
        periodic.reconcile_all(&Domain::SCHEDULED).await;
        periodic.reconcile_all(&Domain::SCHEDULED).await;

        let calls = scheduler.calls();
        assert_eq!(calls.len(), Domain::SCHEDULED.len());
        for d in Domain::SCHEDULED {
            let expected = format!("periodic:{}:false", JobKey::periodic(d).name());
            assert_eq!(calls.iter().filter(|c| **c == expected).count(), 1);
        }
    }

    #[tokio::test]
    async fn finished_job_is_replaced_and_running_one_kept() {
        let (periodic, scheduler) = reconciler();
        let name = JobKey::periodic(Domain::Subscription).name();

        scheduler.set_state(&name, JobState::Running);
        assert!(!periodic.reconcile(Domain::Subscription).await.unwrap());
        assert!(scheduler.calls().is_empty());

        scheduler.set_state(&name, JobState::Cancelled);
        assert!(periodic.reconcile(Domain::Subscription).await.unwrap());
        assert_eq!(scheduler.calls(), vec![format!("periodic:{name}:true")]);
    }
}
