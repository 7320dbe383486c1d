use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::domains::{Domain, DomainLocks, Domains, DurableDomain, TokenSync, TrimPolicy};
use crate::env::EnvironmentFactory;
use crate::error::BuildError;
use crate::events::{Bus, ObservabilitySink};
use crate::host::{DurableStore, LifecycleSignal, ScheduledJobRunner, ServiceHost, TransportClient};
use crate::store::RetryableStore;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::sync::{CommandQueues, ForegroundGate, InitBarrier};
use crate::token::{ProviderKind, TokenManager, TokenProvider};
use crate::workers::{JobDispatch, LocalJobRunner, OneShotRetry, PeriodicReconciler, ServiceGuard};

use super::orchestrator::RetryOrchestrator;
use super::sdk::{Sdk, spawn_listener};

/// Builder for an [`Sdk`] and its collaborators.
///
/// Store, transport, lifecycle and scheduler are required; everything else
/// has a default.
pub struct SdkBuilder {
    cfg: Config,
    store: Option<Arc<dyn DurableStore>>,
    transport: Option<Arc<dyn TransportClient>>,
    lifecycle: Option<Arc<dyn LifecycleSignal>>,
    scheduler: Option<Arc<dyn ScheduledJobRunner>>,
    local: Option<LocalJobRunner>,
    service_host: Option<Arc<dyn ServiceHost>>,
    providers: Vec<Arc<dyn TokenProvider>>,
    priority: Option<Vec<ProviderKind>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SdkBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            store: None,
            transport: None,
            lifecycle: None,
            scheduler: None,
            local: None,
            service_host: None,
            providers: Vec::new(),
            priority: None,
            subscribers: Vec::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn TransportClient>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn LifecycleSignal>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Uses a host-provided scheduler. The host routes fired jobs to
    /// [`Sdk::run_job`](crate::workers::JobDispatch::run_job) itself.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn ScheduledJobRunner>) -> Self {
        self.scheduler = Some(scheduler);
        self.local = None;
        self
    }

    /// Uses an in-process [`LocalJobRunner`], attached to the built [`Sdk`].
    pub fn with_local_scheduler(mut self, runner: LocalJobRunner) -> Self {
        self.scheduler = Some(Arc::new(runner.clone()));
        self.local = Some(runner);
        self
    }

    /// Enables hosting-service self-stop through `host`.
    pub fn with_service_host(mut self, host: Arc<dyn ServiceHost>) -> Self {
        self.service_host = Some(host);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_provider_priority(mut self, order: Vec<ProviderKind>) -> Self {
        self.priority = Some(order);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// With the `logging` feature a [`LogWriter`](crate::LogWriter) is added
    /// when no subscriber is given.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the runtime: bus, subscriber listener, command queues and
    /// domains. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Arc<Sdk>, BuildError> {
        let store = self.store.ok_or(BuildError::MissingCollaborator("store"))?;
        let transport = self
            .transport
            .ok_or(BuildError::MissingCollaborator("transport"))?;
        let lifecycle = self
            .lifecycle
            .ok_or(BuildError::MissingCollaborator("lifecycle"))?;
        let scheduler = self
            .scheduler
            .ok_or(BuildError::MissingCollaborator("scheduler"))?;
        let cfg = self.cfg;

        let bus = Bus::new(cfg.bus_capacity_clamped());
        let sink: Arc<dyn ObservabilitySink> = Arc::new(bus.clone());

        #[allow(unused_mut)]
        let mut subscribers = self.subscribers;
        #[cfg(feature = "logging")]
        if subscribers.is_empty() {
            subscribers.push(Arc::new(crate::subscribers::LogWriter::new()));
        }
        let listener_token = CancellationToken::new();
        let listener = spawn_listener(
            bus.clone(),
            SubscriberSet::new(subscribers, bus.clone()),
            listener_token.clone(),
        );

        let tokens = Arc::new(TokenManager::new(&cfg, sink.clone()));
        for provider in self.providers {
            tokens.register_provider(provider);
        }
        if let Some(order) = self.priority {
            tokens.set_priority(order);
        }

        let locks = Arc::new(DomainLocks::new());
        let env = EnvironmentFactory::new(store.clone(), tokens.clone(), sink.clone());
        let retryable = RetryableStore::new(store.clone(), sink.clone());
        let durable = |domain: Domain, trim: Option<TrimPolicy>| {
            DurableDomain::new(
                domain,
                cfg.retry_policy(domain),
                trim,
                retryable.clone(),
                transport.clone(),
                env.clone(),
                locks.clone(),
                sink.clone(),
            )
            .ok_or(BuildError::MissingCollaborator("durable domain"))
        };
        let domains = Arc::new(Domains {
            subscription: durable(Domain::Subscription, None)?,
            push_event: durable(Domain::PushEvent, None)?,
            mobile_event: durable(
                Domain::MobileEvent,
                Some(TrimPolicy {
                    threshold: cfg.event_queue_threshold,
                    trim_to: cfg.event_queue_trim_to,
                }),
            )?,
            token: TokenSync::new(
                store.clone(),
                transport.clone(),
                env.clone(),
                locks.clone(),
                cfg.subscription_retry.drop_fatal,
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
            tokens.clone(),
            domains.clone(),
            PeriodicReconciler::new(scheduler.clone(), cfg.periodic_interval, sink.clone()),
            one_shot.clone(),
            sink.clone(),
        ));
        let service = self.service_host.map(|host| {
            ServiceGuard::new(
                host,
                lifecycle.clone(),
                cfg.service_retry_threshold,
                cfg.service_stop_delay,
                sink.clone(),
            )
        });

        let sdk = Arc::new(Sdk {
            queues: CommandQueues::spawn(sink.clone()),
            barrier: Arc::new(InitBarrier::new(sink.clone())),
            cfg,
            bus,
            sink,
            store,
            tokens,
            domains,
            one_shot,
            orchestrator,
            service,
            local: self.local.clone(),
            listener: Mutex::new(Some(listener)),
            listener_token,
        });

        if let Some(local) = self.local {
            let dispatch: Arc<dyn JobDispatch> = sdk.clone();
            local.attach(Arc::downgrade(&dispatch));
        }
        Ok(sdk)
    }
}
