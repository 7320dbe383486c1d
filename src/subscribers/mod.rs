//! # Event subscribers for the pushvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   component ── ObservabilitySink ──► Bus ──► Sdk bus listener
//!                                                    │
//!                                                    ▼
//!                                              SubscriberSet::emit
//!                                     ┌──────────────┼──────────────┐
//!                                     ▼              ▼              ▼
//!                                 LogWriter       Metrics        Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use pushvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct ExhaustionCounter;
//!
//! #[async_trait]
//! impl Subscribe for ExhaustionCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::RetryLimitReached {
//!             // increment a counter
//!         }
//!     }
//!     fn name(&self) -> &'static str { "exhaustion-counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;
