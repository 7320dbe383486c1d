//! Runtime events: types, broadcast bus and the observability sink.
//!
//! This module groups the event **data model**, the **bus** that carries
//! events to subscribers, and the [`ObservabilitySink`] contract every
//! component reports through.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//! - [`ObservabilitySink`] `report_error` / `report_event`, implemented by [`Bus`]
//!
//! ## Quick reference
//! - **Publishers**: `SuspendLazy`, `InitBarrier`, `CommandQueue` workers,
//!   `ForegroundGate`, `RetryableStore`, `TokenManager`, domains, workers,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the `Sdk` bus listener, which fans out to the `SubscriberSet`.

mod bus;
mod event;
mod sink;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use sink::ObservabilitySink;
