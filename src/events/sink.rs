//! # Observability sink.
//!
//! [`ObservabilitySink`] is the single reporting contract of the runtime:
//! errors caught at operation boundaries go to [`report_error`](ObservabilitySink::report_error),
//! diagnostics go to [`report_event`](ObservabilitySink::report_event).
//! Both are fire-and-forget and must never fail back into the caller.
//!
//! [`Bus`] implements the trait by turning each report into an [`Event`].

use std::fmt;

use super::{Bus, Event, EventKind};

/// Fire-and-forget reporting of errors and diagnostic events.
pub trait ObservabilitySink: Send + Sync + 'static {
    /// Reports an error caught under `tag`.
    fn report_error(&self, tag: &str, cause: &dyn fmt::Display);

    /// Reports a diagnostic event of `kind` under `tag`.
    fn report_event(&self, tag: &str, kind: EventKind, message: &str, attrs: &[(&str, &str)]);
}

impl ObservabilitySink for Bus {
    fn report_error(&self, tag: &str, cause: &dyn fmt::Display) {
        self.publish(
            Event::new(EventKind::ErrorReported)
                .with_tag(tag)
                .with_reason(cause.to_string()),
        );
    }

    fn report_event(&self, tag: &str, kind: EventKind, message: &str, attrs: &[(&str, &str)]) {
        let ev = attrs.iter().fold(
            Event::new(kind).with_tag(tag).with_reason(message),
            |ev, (k, v)| ev.with_attr(*k, *v),
        );
        self.publish(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bus_turns_reports_into_events() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.report_error("store", &"disk full");
        bus.report_event(
            "retry",
            EventKind::RetryLimitReached,
            "limit",
            &[("item_id", "42")],
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::ErrorReported);
        assert_eq!(first.tag.as_deref(), Some("store"));
        assert_eq!(first.reason.as_deref(), Some("disk full"));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, EventKind::RetryLimitReached);
        assert_eq!(second.attr("item_id"), Some("42"));
        assert!(second.seq > first.seq);
    }
}
