//! # Durable domains: subscription, push-event and mobile-event.
//!
//! All three share one shape: a command persists an item and attempts it
//! once; a retry sweep walks the owner's pending items and re-attempts them
//! through the retry-ceiling chokepoint.
//!
//! ```text
//! submit(payload):  env ─► lock(domain) ─► insert(floor) ─► attempt
//!
//! retry_sweep():    env ─► lock(domain) ─► [trim mobile table]
//!                   for item in enumerate_by_owner(owner):
//!                       check_retry:
//!                         LimitReached         ─► (deleted) next
//!                         Skip                 ─► keep, needs retry
//!                       attempt:
//!                         Success              ─► delete, ItemDelivered
//!                         Fatal + drop_fatal   ─► delete, ItemDropped
//!                         Retryable / Fatal    ─► keep, needs retry
//! ```
//!
//! A sweep that fails as a whole asks for a retry whenever
//! [`CoreError::is_retryable`] holds, so durable work is not given up on a
//! transient crash.

use std::sync::Arc;

use serde_json::Value;

use crate::domains::{Domain, DomainLocks};
use crate::env::EnvironmentFactory;
use crate::error::CoreError;
use crate::events::{EventKind, ObservabilitySink};
use crate::host::{OutboundRequest, RequestKind, SendOutcome, TransportClient};
use crate::policies::RetryPolicy;
use crate::store::{ConfigRecord, RetryCheck, RetryableStore, WorkItem, WorkKind};

/// Outcome of one delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// Delivered and deleted.
    Delivered,
    /// Deleted on a fatal error.
    Dropped,
    /// Still pending.
    Pending,
}

/// Optional row-count valve applied before each sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrimPolicy {
    pub threshold: usize,
    pub trim_to: usize,
}

/// One durable domain.
pub struct DurableDomain {
    domain: Domain,
    kind: WorkKind,
    request: RequestKind,
    policy: RetryPolicy,
    trim: Option<TrimPolicy>,
    store: RetryableStore,
    transport: Arc<dyn TransportClient>,
    env: EnvironmentFactory,
    locks: Arc<DomainLocks>,
    sink: Arc<dyn ObservabilitySink>,
}

impl DurableDomain {
    /// Creates the domain. Returns `None` for domains without durable items.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        domain: Domain,
        policy: RetryPolicy,
        trim: Option<TrimPolicy>,
        store: RetryableStore,
        transport: Arc<dyn TransportClient>,
        env: EnvironmentFactory,
        locks: Arc<DomainLocks>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Option<Self> {
        Some(Self {
            domain,
            kind: domain.work_kind()?,
            request: domain.request_kind()?,
            policy,
            trim,
            store,
            transport,
            env,
            locks,
            sink,
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Persists a new item for `payload` and attempts it once.
    ///
    /// The attempt does not consume retry budget. An item that could not be
    /// persisted is still attempted once.
    pub async fn submit(&self, payload: Value) -> Result<Attempt, CoreError> {
        let env = self.env.create();
        let config = env.config().await?;
        let owner = env.user_tag().await?;
        let auth = env.auth().await?;

        let _lock = self.locks.lock(self.domain).await;
        let item = WorkItem::new(self.kind, owner, payload, self.policy);
        if !self.store.insert(&item).await {
            tracing::debug!(target: "pushvisor", domain = self.domain.as_str(), "item not persisted, attempting once");
        }
        Ok(self.attempt(&item, &config, &auth).await)
    }

    /// Re-attempts every pending item of the current owner.
    ///
    /// Returns `true` if work remains. Failures of the sweep itself are
    /// reported and yield [`CoreError::is_retryable`].
    pub async fn retry_sweep(&self) -> bool {
        match self.sweep().await {
            Ok(needs_retry) => needs_retry,
            Err(err) => {
                self.sink.report_error(self.domain.as_str(), &err);
                err.is_retryable()
            }
        }
    }

    async fn sweep(&self) -> Result<bool, CoreError> {
        let env = self.env.create();
        let config = env.config().await?;
        let owner = env.user_tag().await?;
        let auth = env.auth().await?;

        let _lock = self.locks.lock(self.domain).await;
        if let Some(trim) = self.trim {
            self.store
                .clear_oldest(self.kind, trim.threshold, trim.trim_to)
                .await;
        }

        let mut needs_retry = false;
        for mut item in self.store.enumerate_by_owner(self.kind, &owner).await {
            match self.store.check_retry(&mut item).await {
                RetryCheck::LimitReached => continue,
                RetryCheck::Skip => {
                    needs_retry = true;
                    continue;
                }
                RetryCheck::Attempt => {}
            }
            if self.attempt(&item, &config, &auth).await == Attempt::Pending {
                needs_retry = true;
            }
        }
        Ok(needs_retry)
    }

    async fn attempt(&self, item: &WorkItem, config: &ConfigRecord, auth: &str) -> Attempt {
        let request = OutboundRequest {
            kind: self.request,
            endpoint: config.endpoint.clone(),
            auth: auth.to_string(),
            item_id: Some(item.id),
            payload: item.payload.clone(),
        };
        let id = item.id.to_string();
        let tag = self.domain.as_str();

        match self.transport.send(request).await {
            SendOutcome::Success(_) => {
                self.store.delete(item).await;
                self.sink.report_event(
                    tag,
                    EventKind::ItemDelivered,
                    "item delivered",
                    &[("item_id", id.as_str())],
                );
                Attempt::Delivered
            }
            SendOutcome::Fatal(reason) if self.policy.drop_fatal => {
                self.store.delete(item).await;
                self.sink.report_event(
                    tag,
                    EventKind::ItemDropped,
                    &reason,
                    &[("item_id", id.as_str())],
                );
                Attempt::Dropped
            }
            SendOutcome::Fatal(reason) => {
                self.sink.report_error(tag, &CoreError::Fatal { reason });
                Attempt::Pending
            }
            SendOutcome::Retryable(reason) => {
                self.sink.report_error(tag, &CoreError::Transport { reason });
                Attempt::Pending
            }
        }
    }
}
