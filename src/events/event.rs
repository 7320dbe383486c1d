//! # Runtime events emitted by the primitives, domains and workers.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Reports**: errors and failures caught at operation boundaries
//! - **Delivery**: durable item outcomes (delivered, dropped, exhausted, trimmed)
//! - **Scheduling**: periodic/one-shot job scheduling, service stop requests
//! - **Subscriber**: fan-out overflow and subscriber panics
//!
//! The [`Event`] struct carries metadata such as timestamp, tag, reason and
//! free-form attributes (item id, domain, token provider...).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use pushvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryLimitReached)
//!     .with_tag("subscription")
//!     .with_reason("retry limit reached")
//!     .with_attr("item_id", "b7c1");
//!
//! assert_eq!(ev.kind, EventKind::RetryLimitReached);
//! assert_eq!(ev.tag.as_deref(), Some("subscription"));
//! assert_eq!(ev.attr("item_id"), Some("b7c1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Reports ===
    /// An error was caught and swallowed at an operation boundary.
    ///
    /// Sets: `tag` (origin), `reason` (error message).
    ErrorReported,

    /// A queued command failed (error or panic); the queue keeps going.
    ///
    /// Sets: `tag` (queue name), `reason`, attr `error` (error label or `panic`).
    CommandFailed,

    /// A wait on the initialization gate expired.
    ///
    /// Sets: `tag` (waiter), attrs `timeout_ms`, `epoch`.
    InitTimeout,

    // === Delivery ===
    /// A durable item was delivered and deleted.
    ///
    /// Sets: `tag` (domain), attr `item_id`.
    ItemDelivered,

    /// A durable item was deleted on a fatal transport error.
    ///
    /// Sets: `tag` (domain), `reason`, attr `item_id`.
    ItemDropped,

    /// A durable item crossed its retry ceiling and was deleted.
    ///
    /// Sets: `tag` (domain), attr `item_id`.
    RetryLimitReached,

    /// The mobile-event table was trimmed by the safety valve.
    ///
    /// Sets: `tag`, attr `removed`.
    QueueTrimmed,

    /// A push token value was announced for the first time in this process.
    ///
    /// Sets: `tag`, attr `provider`.
    TokenAcquired,

    // === Scheduling ===
    /// A periodic reconciliation job was (re)scheduled.
    ///
    /// Sets: `tag` (job name).
    PeriodicScheduled,

    /// A one-shot retry job was scheduled (superseding any pending one).
    ///
    /// Sets: `tag` (job tag).
    OneShotScheduled,

    /// A hosting service was asked to stop itself.
    ///
    /// Sets: `tag` (domain), attr `delay_ms`.
    ServiceStopRequested,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `tag` (subscriber name), `reason`.
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `tag` (subscriber name), `reason` (panic message).
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Reporting component or domain.
    pub tag: Option<Arc<str>>,
    /// Human-readable reason (errors, diagnostics).
    pub reason: Option<Arc<str>>,
    /// Free-form key/value attributes.
    pub attrs: Vec<(Arc<str>, Arc<str>)>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            tag: None,
            reason: None,
            attrs: Vec::new(),
        }
    }

    /// Attaches the reporting tag.
    #[inline]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Appends a key/value attribute.
    #[inline]
    pub fn with_attr(mut self, key: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    /// Returns the first attribute value stored under `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_ref())
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_tag(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_tag(subscriber)
            .with_reason(info)
    }
}
