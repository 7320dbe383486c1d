//! # pushvisor
//!
//! **Pushvisor** is the retry and initialization core of a client-side
//! push/event delivery SDK.
//!
//! Requests (subscriptions, push interaction events, application events,
//! token updates) are persisted before they are sent. Whatever the transport
//! could not deliver is retried by background jobs with a bounded per-item
//! retry budget, gated on SDK initialization and on the app being foreground.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   subscribe / send_*_event / update_token / initialize
//!            │
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Sdk (public façade)                                              │
//! │  - CommandQueues (init / subscription / mobile_event, FIFO)       │
//! │  - InitBarrier (one gate per initialization epoch)                │
//! │  - Domains (durable domains + token sync, per-domain locks)       │
//! │  - RetryOrchestrator (once-per-process retry pass)                │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  ┌──────────────┐  ┌───────────────┐  ┌──────────────┐       │
//!  │DurableDomain │  │ TokenSync     │  │ OneShotRetry │       │
//!  │ persist+send │  │ last_token ≠? │  │ PeriodicRec. │       │
//!  │ retry_sweep  │  │  send+record  │  │ (scheduler)  │       │
//!  └──────┬───────┘  └──────┬────────┘  └──────┬───────┘       │
//!         │ DurableStore    │ TransportClient  │ ScheduledJobRunner
//!         ▼                 ▼                  ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │           ObservabilitySink ─► Bus (broadcast channel)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                         bus listener (in Sdk)
//!                                   ▼
//!                             SubscriberSet
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                      LogWriter  sub2     subN
//! ```
//!
//! ### Retry budget
//! ```text
//! sweep:  for each persisted item (oldest first)
//!           ├─ retry_count > max_retry_count ─► RetryLimitReached, delete
//!           ├─ increment not persisted ─► skip until the next sweep
//!           └─ otherwise ─► retry_count += 1 (persisted) ─► send
//!                             ├─ Success ─► delete, ItemDelivered
//!                             ├─ Fatal + drop_fatal ─► delete, ItemDropped
//!                             └─ otherwise ─► keep, sweep reports "retry"
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Sdk**           | Non-blocking public operations, initialization, shutdown.    | [`Sdk`], [`SdkBuilder`]                     |
//! | **Host contracts**| Storage, network, lifecycle, scheduling, hosting service.    | [`DurableStore`], [`TransportClient`], ...  |
//! | **Scheduling**    | Periodic reconciliation and one-shot retry jobs.             | [`JobDispatch`], [`LocalJobRunner`]         |
//! | **Tokens**        | Provider scan, manual override, token sync.                  | [`TokenManager`], [`TokenProvider`]         |
//! | **Policies**      | Retry budgets and one-shot backoff.                          | [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **Subscriber API**| Hook into runtime events (logging, metrics...).              | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for domain operations.                          | [`CoreError`], [`MissingPrecondition`]      |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] (enabled by default).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::json;
//! use pushvisor::{
//!     Config, ConfigRecord, HostLifecycle, LocalJobRunner, MemoryStore, OutboundRequest,
//!     SendOutcome, Sdk, TransportClient,
//! };
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl TransportClient for Loopback {
//!     async fn send(&self, _request: OutboundRequest) -> SendOutcome {
//!         SendOutcome::Success(json!({"ok": true}))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sdk = Sdk::builder(Config::default())
//!         .with_store(Arc::new(MemoryStore::new()))
//!         .with_transport(Arc::new(Loopback))
//!         .with_lifecycle(Arc::new(HostLifecycle::new(true)))
//!         .with_local_scheduler(LocalJobRunner::new())
//!         .build()?;
//!
//!     sdk.initialize(ConfigRecord {
//!         endpoint: "demo".into(),
//!         user_tag: Some("device-1".into()),
//!         auth_token: Some("secret".into()),
//!         last_token: None,
//!     })?;
//!     sdk.send_mobile_event(json!({"name": "app_opened"}))?;
//!
//!     sdk.shutdown().await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod domains;
mod env;
mod error;
mod events;
mod host;
mod policies;
mod store;
mod subscribers;
mod sync;
mod token;
mod workers;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{RetryOrchestrator, Sdk, SdkBuilder};
pub use domains::{Attempt, Domain, DomainLocks, Domains, DurableDomain, TokenSync, TrimPolicy};
pub use env::{Environment, EnvironmentFactory};
pub use error::{BuildError, CoreError, MissingPrecondition, SchedulerError, StoreError, SubmitError};
pub use events::{Bus, Event, EventKind, ObservabilitySink};
pub use host::{
    DurableStore, HostLifecycle, JobState, LifecycleSignal, MemoryStore, OutboundRequest,
    RequestKind, ScheduledJobRunner, SendOutcome, ServiceHost, StoreOp, TransportClient,
};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use store::{ConfigField, ConfigRecord, RetryCheck, RetryableStore, WorkId, WorkItem, WorkKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use sync::{
    Command, CommandQueue, CommandQueues, ForegroundGate, GateState, InitBarrier, InitGate,
    QueueKind, SuspendLazy,
};
pub use token::{ProviderKind, TokenCandidate, TokenManager, TokenOrigin, TokenProvider};
pub use workers::{
    JobDispatch, JobKey, JobKind, LocalJobRunner, OneShotRetry, PeriodicReconciler, ServiceGuard,
    WorkResult,
};

// Built-in logger subscriber rendering events through `tracing`.
// Enabled by default via the `logging` feature.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
