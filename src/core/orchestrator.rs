//! # Retry orchestrator.
//!
//! Runs the background retry pass at most once per process, the first time
//! the app is foreground after initialization.
//!
//! ```text
//! perform_retry_operations()
//!   └─► ForegroundGate::on_foreground(run_pass)        (deduplicated)
//!
//! run_pass():
//!   app not foreground?         ─► return, no side effects
//!   CAS ran false → true lost?  ─► return (already ran in this process)
//!   push = TokenManager::is_push_active()
//!   join!(
//!     PeriodicReconciler::reconcile_all(scheduled domains, push ones only if push),
//!     sweep(mobile_event),
//!     if push { sweep(subscription), sweep(push_event), check_and_update(token) },
//!   )
//!   every sweep that still has work ─► OneShotRetry::schedule(domain)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::domains::{Domain, Domains};
use crate::events::ObservabilitySink;
use crate::host::LifecycleSignal;
use crate::sync::ForegroundGate;
use crate::token::TokenManager;
use crate::workers::{OneShotRetry, PeriodicReconciler};

/// Process-wide, run-once retry trigger.
pub struct RetryOrchestrator {
    gate: ForegroundGate,
    lifecycle: Arc<dyn LifecycleSignal>,
    ran: AtomicBool,
    tokens: Arc<TokenManager>,
    domains: Arc<Domains>,
    periodic: PeriodicReconciler,
    one_shot: Arc<OneShotRetry>,
    sink: Arc<dyn ObservabilitySink>,
}

impl RetryOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gate: ForegroundGate,
        lifecycle: Arc<dyn LifecycleSignal>,
        tokens: Arc<TokenManager>,
        domains: Arc<Domains>,
        periodic: PeriodicReconciler,
        one_shot: Arc<OneShotRetry>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            gate,
            lifecycle,
            ran: AtomicBool::new(false),
            tokens,
            domains,
            periodic,
            one_shot,
            sink,
        }
    }

    /// Arms the pass for the next foreground moment.
    ///
    /// Returns `None` if a foreground wait is already pending.
    pub fn perform_retry_operations(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let me = Arc::clone(self);
        self.gate.on_foreground(move || async move {
            me.run_pass().await;
            Ok(())
        })
    }

    /// `true` once a pass has started in this process.
    pub fn has_run(&self) -> bool {
        self.ran.load(Ordering::Acquire)
    }

    /// Runs the pass if the app is foreground and no pass ran before.
    ///
    /// Returns `true` if this call ran the pass.
    pub async fn run_pass(&self) -> bool {
        if !self.lifecycle.is_foreground_now() {
            return false;
        }
        if self
            .ran
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let push = self.tokens.is_push_active();
        let scheduled: Vec<Domain> = Domain::SCHEDULED
            .into_iter()
            .filter(|d| push || !d.is_push())
            .collect();
        tracing::debug!(target: "pushvisor", push, "retry pass started");

        let sweeps = scheduled.iter().map(|d| async move { (*d, self.domains.sweep(*d).await) });
        let (_, results) = tokio::join!(self.periodic.reconcile_all(&scheduled), join_all(sweeps));

        for (domain, needs_retry) in results {
            if !needs_retry {
                continue;
            }
            if let Err(err) = self.one_shot.schedule(domain).await {
                self.sink.report_error(domain.as_str(), &err);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domains::{DomainLocks, DurableDomain, TokenSync};
    use crate::env::EnvironmentFactory;
    use crate::events::Bus;
    use crate::host::{
        DurableStore, HostLifecycle, MemoryStore, OutboundRequest, SendOutcome, TransportClient,
    };
    use crate::policies::RetryPolicy;
    use crate::store::{ConfigRecord, RetryableStore, WorkItem, WorkKind};
    use crate::workers::JobKey;
    use crate::workers::testing::Recording;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct Offline(Mutex<usize>);

    #[async_trait]
    impl TransportClient for Offline {
        async fn send(&self, _request: OutboundRequest) -> SendOutcome {
            *self.0.lock().unwrap() += 1;
            SendOutcome::Retryable("offline".into())
        }
    }

    struct Fixture {
        orchestrator: Arc<RetryOrchestrator>,
        scheduler: Arc<Recording>,
        lifecycle: Arc<HostLifecycle>,
        store: Arc<MemoryStore>,
        transport: Arc<Offline>,
    }

    async fn fixture(foreground: bool) -> Fixture {
        let cfg = Config::default();
        let sink: Arc<dyn ObservabilitySink> = Arc::new(Bus::new(64));
        let store = Arc::new(MemoryStore::new());
        store
            .write_config(&ConfigRecord {
                endpoint: "ep".into(),
                user_tag: Some("u1".into()),
                auth_token: Some("auth".into()),
                last_token: None,
            })
            .await
            .unwrap();
        let transport = Arc::new(Offline(Mutex::new(0)));
        let scheduler = Arc::new(Recording::default());
        let lifecycle = Arc::new(HostLifecycle::new(foreground));
        let tokens = Arc::new(TokenManager::new(&cfg, sink.clone()));
        let locks = Arc::new(DomainLocks::new());
        let env = EnvironmentFactory::new(store.clone(), tokens.clone(), sink.clone());
        let durable = |d: Domain| {
            DurableDomain::new(
                d,
                cfg.retry_policy(d),
                None,
                RetryableStore::new(store.clone(), sink.clone()),
                transport.clone(),
                env.clone(),
                locks.clone(),
                sink.clone(),
            )
            .unwrap()
        };
        let domains = Arc::new(Domains {
            subscription: durable(Domain::Subscription),
            push_event: durable(Domain::PushEvent),
            mobile_event: durable(Domain::MobileEvent),
            token: TokenSync::new(
                store.clone(),
                transport.clone(),
                env.clone(),
                locks,
                false,
                sink.clone(),
            ),
        });
        let one_shot = Arc::new(OneShotRetry::new(
            scheduler.clone(),
            lifecycle.clone(),
            cfg.one_shot_backoff,
            cfg.background_settle,
            sink.clone(),
        ));
        let orchestrator = Arc::new(RetryOrchestrator::new(
            ForegroundGate::new(lifecycle.clone(), sink.clone()),
            lifecycle.clone(),
            tokens,
            domains,
            PeriodicReconciler::new(scheduler.clone(), cfg.periodic_interval, sink.clone()),
            one_shot,
            sink,
        ));
        Fixture {
            orchestrator,
            scheduler,
            lifecycle,
            store,
            transport,
        }
    }

    #[tokio::test]
    async fn backgrounded_pass_has_no_side_effects() {
        let f = fixture(false).await;
        let item = WorkItem::new(WorkKind::MobileEvent, "u1", json!({}), RetryPolicy::new(1, 5));
        f.store.insert(&item).await.unwrap();

        assert!(!f.orchestrator.run_pass().await);
        assert!(!f.orchestrator.has_run());
        assert!(f.scheduler.calls().is_empty());
        assert_eq!(*f.transport.0.lock().unwrap(), 0);
        assert_eq!(f.store.snapshot(WorkKind::MobileEvent).await[0].retry_count, 1);
    }

    #[tokio::test]
    async fn pass_runs_once_and_reschedules_pending_work() {
        let f = fixture(false).await;
        let item = WorkItem::new(WorkKind::MobileEvent, "u1", json!({}), RetryPolicy::new(1, 5));
        f.store.insert(&item).await.unwrap();
        f.lifecycle.set_foreground(true);

        assert!(f.orchestrator.run_pass().await);
        assert!(f.orchestrator.has_run());
        assert!(!f.orchestrator.run_pass().await);

        // Push is inactive: only the mobile-event domain is touched.
        let tag = JobKey::one_shot(Domain::MobileEvent).name();
        assert_eq!(
            f.scheduler.calls(),
            vec![
                format!("periodic:{}:false", JobKey::periodic(Domain::MobileEvent).name()),
                format!("cancel:{tag}"),
                format!("one_shot:{tag}"),
            ]
        );
        assert_eq!(*f.transport.0.lock().unwrap(), 1);
        assert_eq!(f.store.snapshot(WorkKind::MobileEvent).await[0].retry_count, 2);
    }

    #[tokio::test]
    async fn armed_pass_fires_on_foreground() {
        let f = fixture(false).await;
        let handle = f.orchestrator.perform_retry_operations().unwrap();
        assert!(f.orchestrator.perform_retry_operations().is_none());
        tokio::task::yield_now().await;
        assert!(!f.orchestrator.has_run());

        f.lifecycle.set_foreground(true);
        handle.await.unwrap();
        assert!(f.orchestrator.has_run());
    }
}
