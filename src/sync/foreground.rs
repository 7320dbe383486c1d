//! # Deduplicated foreground wait.
//!
//! [`ForegroundGate::on_foreground`] runs a callback once the app is
//! foreground. At most one wait is in flight process-wide; a call made while
//! one is pending is dropped, not queued.
//!
//! ```text
//! on_foreground(cb) ─► CAS in_flight false→true ── lost ─► dropped (None)
//!                              │ won
//!                              ▼
//!                spawn: wait_for(foreground)   (fires at once if already foreground)
//!                              │ lifecycle closed ─► report Canceled, callback dropped
//!                              ▼
//!                       cb().await (catch_unwind)
//!                              ▼
//!                 guard drop: in_flight = false  (also on abort / panic)
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::error::CoreError;
use crate::events::ObservabilitySink;
use crate::host::LifecycleSignal;
use crate::subscribers::panic_message;

const TAG: &str = "foreground";

/// Clears the in-flight flag when the wait ends, however it ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// "Run once the app is foreground", with at most one pending wait.
pub struct ForegroundGate {
    lifecycle: Arc<dyn LifecycleSignal>,
    in_flight: Arc<AtomicBool>,
    sink: Arc<dyn ObservabilitySink>,
}

impl ForegroundGate {
    /// Creates a gate over the host's lifecycle signal.
    pub fn new(lifecycle: Arc<dyn LifecycleSignal>, sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            lifecycle,
            in_flight: Arc::new(AtomicBool::new(false)),
            sink,
        }
    }

    /// Returns `true` while a wait is registered.
    pub fn is_waiting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs `callback` on the next foreground state (immediately if already
    /// foreground).
    ///
    /// Returns `None` when a wait is already in flight. Aborting the returned
    /// handle cancels the wait and clears the flag. Callback errors and panics
    /// are reported, never propagated.
    pub fn on_foreground<F, Fut>(&self, callback: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(target: "pushvisor", "foreground wait already in flight, dropped");
            return None;
        }

        let guard = InFlight(self.in_flight.clone());
        let mut rx = self.lifecycle.watch_foreground();
        let sink = self.sink.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            if rx.wait_for(|fg| *fg).await.is_err() {
                // Lifecycle source went away; nothing will ever turn foreground.
                sink.report_error(TAG, &CoreError::Canceled);
                return;
            }
            match AssertUnwindSafe(async move { callback().await })
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => sink.report_error(TAG, &err),
                Err(panic) => sink.report_error(TAG, &format!("panic: {}", panic_message(&*panic))),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Bus, EventKind};
    use crate::host::HostLifecycle;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::watch;

    /// Lifecycle whose sender is already gone.
    struct Closed;

    impl LifecycleSignal for Closed {
        fn is_foreground_now(&self) -> bool {
            false
        }

        fn watch_foreground(&self) -> watch::Receiver<bool> {
            watch::channel(false).1
        }
    }

    fn gate(foreground: bool) -> (ForegroundGate, Arc<HostLifecycle>, Bus) {
        let bus = Bus::new(16);
        let lifecycle = Arc::new(HostLifecycle::new(foreground));
        (
            ForegroundGate::new(lifecycle.clone(), Arc::new(bus.clone())),
            lifecycle,
            bus,
        )
    }

    #[tokio::test]
    async fn concurrent_registrations_fire_once() {
        let (gate, lifecycle, _) = gate(false);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let calls = calls.clone();
            handles.extend(gate.on_foreground(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        assert_eq!(handles.len(), 1);
        assert!(gate.is_waiting());

        lifecycle.set_foreground(true);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!gate.is_waiting());
    }

    #[tokio::test]
    async fn fires_immediately_when_foreground_and_rearms() {
        let (gate, _, _) = gate(true);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let handle = gate
                .on_foreground(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
            handle.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abort_clears_flag() {
        let (gate, _, _) = gate(false);
        let handle = gate.on_foreground(|| async { Ok(()) }).unwrap();
        handle.abort();
        let _ = handle.await;
        assert!(!gate.is_waiting());
        assert!(gate.on_foreground(|| async { Ok(()) }).is_some());
    }

    #[tokio::test]
    async fn callback_panic_is_reported() {
        let (gate, _, bus) = gate(true);
        let mut rx = bus.subscribe();
        gate.on_foreground(|| async {
            if true {
                panic!("boom");
            }
            Ok(())
        })
            .unwrap()
            .await
            .unwrap();

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ErrorReported);
        assert!(ev.reason.as_deref().unwrap().contains("boom"));
        assert!(!gate.is_waiting());
    }

    #[tokio::test]
    async fn closed_lifecycle_cancels_the_wait() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let gate = ForegroundGate::new(Arc::new(Closed), Arc::new(bus));
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        gate.on_foreground(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap()
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ErrorReported);
        assert_eq!(ev.reason.as_deref(), Some("operation cancelled"));
        assert!(!gate.is_waiting());
    }
}
