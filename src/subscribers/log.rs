//! # LogWriter: renders runtime events through `tracing`
//!
//! ## Example output (fmt subscriber)
//! ```text
//! ERROR pushvisor: error reported tag="subscription" reason="store backend failure: locked"
//!  WARN pushvisor: retry limit reached tag="push_event" item_id="3f0c..."
//!  WARN pushvisor: init wait timed out tag="subscription" timeout_ms=7000
//!  INFO pushvisor: token acquired provider="firebase"
//! DEBUG pushvisor: one-shot scheduled tag="pushvisor.one_shot.subscription"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tag = e.tag.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ErrorReported => error!(target: "pushvisor", tag, reason, "error reported"),
            EventKind::CommandFailed => error!(target: "pushvisor", tag, reason, error = ?e.attr("error"), "command failed"),
            EventKind::InitTimeout => {
                warn!(target: "pushvisor", tag, timeout_ms = ?e.attr("timeout_ms"), "init wait timed out")
            }
            EventKind::RetryLimitReached => {
                warn!(target: "pushvisor", tag, item_id = ?e.attr("item_id"), "retry limit reached")
            }
            EventKind::ItemDropped => {
                warn!(target: "pushvisor", tag, item_id = ?e.attr("item_id"), reason, "item dropped")
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "pushvisor", subscriber = tag, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                error!(target: "pushvisor", subscriber = tag, reason, "subscriber panicked")
            }
            EventKind::TokenAcquired => {
                info!(target: "pushvisor", provider = ?e.attr("provider"), "token acquired")
            }
            EventKind::QueueTrimmed => {
                info!(target: "pushvisor", tag, removed = ?e.attr("removed"), "event queue trimmed")
            }
            EventKind::ServiceStopRequested => {
                info!(target: "pushvisor", tag, delay_ms = ?e.attr("delay_ms"), "service stop requested")
            }
            EventKind::ItemDelivered => {
                debug!(target: "pushvisor", tag, item_id = ?e.attr("item_id"), "item delivered")
            }
            EventKind::PeriodicScheduled => debug!(target: "pushvisor", tag, "periodic scheduled"),
            EventKind::OneShotScheduled => debug!(target: "pushvisor", tag, "one-shot scheduled"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
