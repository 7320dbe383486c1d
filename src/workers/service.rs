//! # Hosting-service self-stop.
//!
//! A foreground service hosting a domain's sweeps asks [`ServiceGuard`] after
//! every pass whether it should close:
//!
//! ```text
//! after_pass(domain, needs_retry)
//!   ├─ !needs_retry                      ─► stop (work done)
//!   ├─ ++counter >= threshold            ─► stop, counter = 0
//!   ├─ app backgrounded                  ─► stop, counter = 0
//!   └─ otherwise                         ─► keep running
//! stop = sleep(stop_delay) then ServiceHost::stop_service(domain), in the background
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::domains::Domain;
use crate::events::{EventKind, ObservabilitySink};
use crate::host::{LifecycleSignal, ServiceHost};

/// Per-domain retry counters deciding when a hosting service stops.
pub struct ServiceGuard {
    host: Arc<dyn ServiceHost>,
    lifecycle: Arc<dyn LifecycleSignal>,
    counters: [AtomicU32; 5],
    threshold: u32,
    stop_delay: Duration,
    sink: Arc<dyn ObservabilitySink>,
}

impl ServiceGuard {
    pub fn new(
        host: Arc<dyn ServiceHost>,
        lifecycle: Arc<dyn LifecycleSignal>,
        threshold: u32,
        stop_delay: Duration,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            host,
            lifecycle,
            counters: Default::default(),
            threshold: threshold.max(1),
            stop_delay,
            sink,
        }
    }

    /// Current retry counter of `domain`.
    pub fn retries(&self, domain: Domain) -> u32 {
        self.counters[domain as usize].load(Ordering::Acquire)
    }

    /// Records a pass; returns `true` if a stop was requested.
    pub fn after_pass(&self, domain: Domain, needs_retry: bool) -> bool {
        let counter = &self.counters[domain as usize];
        if needs_retry {
            let retries = counter.fetch_add(1, Ordering::AcqRel) + 1;
            if retries < self.threshold && self.lifecycle.is_foreground_now() {
                return false;
            }
        }
        counter.store(0, Ordering::Release);
        self.request_stop(domain);
        true
    }

    fn request_stop(&self, domain: Domain) {
        let delay_ms = self.stop_delay.as_millis().to_string();
        self.sink.report_event(
            domain.as_str(),
            EventKind::ServiceStopRequested,
            "service stop requested",
            &[("delay_ms", delay_ms.as_str())],
        );
        let host = self.host.clone();
        let delay = self.stop_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            host.stop_service(domain);
        });
    }
}
