//! # Sdk: public façade of the runtime.
//!
//! Every public operation is non-blocking: it submits a command to the
//! domain's [`CommandQueue`](crate::CommandQueue) and returns. Queue workers
//! wait for initialization, run the domain operation and schedule its
//! one-shot retry job.
//!
//! The wait is best-effort. A timed out or failed gate is reported and the
//! operation runs anyway; the [`Environment`](crate::Environment) accessors
//! reject it if a precondition is actually missing.
//!
//! ```text
//! initialize(rec) ─► init queue:  reserve gate ─► write config ─► complete / fail
//!                                                     └─► perform_retry_operations()
//! subscribe(p)    ─► subscription queue ─┐
//! send_push_event ─► subscription queue ─┼─► await_init ─► DurableDomain::submit
//! send_mobile_ev. ─► mobile queue ───────┘                └─► OneShotRetry::schedule
//! update_token()  ─► subscription queue ─► await_init ─► TokenSync::check_and_update
//!
//! scheduler ─► run_job(key) ─► periodic: sweep / one-shot: OneShotRetry::run(sweep)
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::select;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::domains::{Domain, Domains};
use crate::error::{CoreError, SubmitError};
use crate::events::{Bus, Event, ObservabilitySink};
use crate::host::DurableStore;
use crate::store::ConfigRecord;
use crate::subscribers::SubscriberSet;
use crate::sync::{CommandQueues, GateState, InitBarrier};
use crate::token::{ProviderKind, TokenManager, TokenProvider};
use crate::workers::{JobDispatch, JobKey, JobKind, LocalJobRunner, OneShotRetry, ServiceGuard, WorkResult};

use super::builder::SdkBuilder;
use super::orchestrator::RetryOrchestrator;

/// Forwards bus events to the subscriber set until `token` is cancelled,
/// then drains what is left and shuts the set down.
pub(super) fn spawn_listener(
    bus: Bus,
    subs: SubscriberSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            select! {
                _ = token.cancelled() => break,
                ev = rx.recv() => match ev {
                    Ok(ev) => subs.emit(ev),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(target: "pushvisor", skipped = n, "event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        while let Ok(ev) = rx.try_recv() {
            subs.emit(ev);
        }
        subs.shutdown().await;
    })
}

/// Client-side delivery runtime.
pub struct Sdk {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) sink: Arc<dyn ObservabilitySink>,
    pub(super) queues: CommandQueues,
    pub(super) barrier: Arc<InitBarrier>,
    pub(super) store: Arc<dyn DurableStore>,
    pub(super) tokens: Arc<TokenManager>,
    pub(super) domains: Arc<Domains>,
    pub(super) one_shot: Arc<OneShotRetry>,
    pub(super) orchestrator: Arc<RetryOrchestrator>,
    pub(super) service: Option<ServiceGuard>,
    pub(super) local: Option<LocalJobRunner>,
    pub(super) listener: Mutex<Option<JoinHandle<()>>>,
    pub(super) listener_token: CancellationToken,
}

impl Sdk {
    /// Returns a builder for an [`Sdk`].
    pub fn builder(cfg: Config) -> SdkBuilder {
        SdkBuilder::new(cfg)
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Subscribes to runtime events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Current initialization state.
    pub fn init_state(&self) -> GateState {
        self.barrier.current().state()
    }

    /// Token manager (providers, priority, manual override).
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Writes the configuration row and resolves the initialization gate.
    ///
    /// Commands submitted before or during initialization wait for it (up to
    /// `init_timeout`). A successful initialization arms the retry pass; a
    /// failed one leaves any previously written configuration in place.
    pub fn initialize(&self, record: ConfigRecord) -> Result<(), SubmitError> {
        let gate = self.barrier.reserve();
        let barrier = self.barrier.clone();
        let store = self.store.clone();
        let orchestrator = self.orchestrator.clone();

        self.queues.get(Domain::Init.queue()).submit(async move {
            match store.write_config(&record).await {
                Ok(()) => {
                    barrier.complete(&gate);
                    orchestrator.perform_retry_operations();
                    Ok(())
                }
                Err(err) => {
                    barrier.fail(&gate, &err);
                    Err(err.into())
                }
            }
        })
    }

    /// Persists and sends a subscription request.
    pub fn subscribe(&self, payload: Value) -> Result<(), SubmitError> {
        self.submit_durable(Domain::Subscription, payload)
    }

    /// Persists and sends a push interaction event.
    pub fn send_push_event(&self, payload: Value) -> Result<(), SubmitError> {
        self.submit_durable(Domain::PushEvent, payload)
    }

    /// Persists and sends an application event.
    pub fn send_mobile_event(&self, payload: Value) -> Result<(), SubmitError> {
        self.submit_durable(Domain::MobileEvent, payload)
    }

    /// Sends the current push token if the server has not seen it.
    pub fn update_token(&self) -> Result<(), SubmitError> {
        let domains = self.domains.clone();
        let one_shot = self.one_shot.clone();
        self.submit(Domain::TokenUpdate, async move {
            if domains.token.check_and_update().await {
                one_shot.schedule(Domain::TokenUpdate).await?;
            }
            Ok(())
        })
    }

    /// Sets the manual token override and syncs it.
    pub fn set_manual_token(&self, token: impl Into<String>) -> Result<(), SubmitError> {
        self.tokens.set_manual_token(token);
        self.update_token()
    }

    /// Clears the manual token override.
    pub fn clear_manual_token(&self) {
        self.tokens.clear_manual_token();
    }

    /// Registers a token provider at runtime.
    pub fn register_provider(&self, provider: Arc<dyn TokenProvider>) {
        self.tokens.register_provider(provider);
    }

    /// Replaces the provider scan order.
    pub fn set_provider_priority(&self, order: Vec<ProviderKind>) {
        self.tokens.set_priority(order);
    }

    /// Arms the once-per-process retry pass for the next foreground moment.
    pub fn perform_retry_operations(&self) -> Option<JoinHandle<()>> {
        self.orchestrator.perform_retry_operations()
    }

    /// One pass of a hosting foreground service: sweep `domain`, then let the
    /// service guard decide whether the service stops.
    ///
    /// Returns the sweep result.
    pub async fn run_service_pass(&self, domain: Domain) -> WorkResult {
        let needs_retry = self.domains.sweep(domain).await;
        if let Some(guard) = &self.service {
            guard.after_pass(domain, needs_retry);
        }
        WorkResult::from(needs_retry)
    }

    /// Closes the queues (draining submitted commands), stops the local
    /// scheduler and the event listener.
    pub async fn shutdown(&self) {
        self.queues.shutdown().await;
        if let Some(local) = &self.local {
            local.shutdown();
        }
        self.listener_token.cancel();
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }

    fn submit_durable(&self, domain: Domain, payload: Value) -> Result<(), SubmitError> {
        let domains = self.domains.clone();
        let one_shot = self.one_shot.clone();
        self.submit(domain, async move {
            let Some(durable) = domains.durable(domain) else {
                return Ok(());
            };
            durable.submit(payload).await?;
            one_shot.schedule(domain).await
        })
    }

    /// Queues `op` behind the current initialization gate.
    fn submit<F>(&self, domain: Domain, op: F) -> Result<(), SubmitError>
    where
        F: std::future::Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        let barrier = self.barrier.clone();
        let sink = self.sink.clone();
        let wait = self.cfg.init_wait();
        self.queues.get(domain.queue()).submit(async move {
            let gate = barrier.current();
            if let GateState::Failed(reason) = barrier.await_init(domain.as_str(), &gate, wait).await {
                sink.report_error(
                    domain.as_str(),
                    &CoreError::InitFailed {
                        reason: reason.to_string(),
                    },
                );
            }
            op.await
        })
    }
}

#[async_trait]
impl JobDispatch for Sdk {
    /// Periodic jobs sweep directly; one-shot jobs settle first when the app
    /// is backgrounded. Push domains are skipped while push is inactive.
    async fn run_job(&self, key: JobKey) -> WorkResult {
        if key.domain.is_push() && !self.tokens.is_push_active() {
            return WorkResult::Success;
        }
        match key.kind {
            JobKind::Periodic => WorkResult::from(self.domains.sweep(key.domain).await),
            JobKind::OneShot => {
                self.one_shot
                    .run(|| self.domains.sweep(key.domain))
                    .await
            }
        }
    }
}
