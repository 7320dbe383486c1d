//! # Initialization barrier.
//!
//! [`InitBarrier`] owns the *current* [`InitGate`]. A gate resolves exactly
//! once, to `Ready` or `Failed`; a new initialization epoch starts only when
//! someone [`reserve`](InitBarrier::reserve)s while the current gate is resolved.
//!
//! ```text
//!  reserve() ──► current pending? ── yes ─► same gate (join in-progress init)
//!                      │
//!                      no (resolved)
//!                      ▼
//!               publish new Pending gate (epoch + 1) ─► return it
//!
//!  complete(g) / fail(g, why): resolve g once, later calls are no-ops
//!  await_init(tag, g, timeout): resolved ─► return
//!                               pending  ─► suspend until resolved or timeout
//!                                           (timeout ─► InitTimeout event, return)
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::CoreError;
use crate::events::{EventKind, ObservabilitySink};

/// Resolution state of an [`InitGate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateState {
    /// Initialization still running.
    Pending,
    /// Initialization succeeded.
    Ready,
    /// Initialization failed with the given reason.
    Failed(Arc<str>),
}

impl GateState {
    /// Returns `true` unless the state is [`GateState::Pending`].
    pub fn is_resolved(&self) -> bool {
        !matches!(self, GateState::Pending)
    }
}

struct GateInner {
    epoch: u64,
    state: watch::Sender<GateState>,
}

/// One initialization epoch: a single-resolution point many waiters can await.
///
/// Cloning is cheap; clones refer to the same gate. Equality is identity.
#[derive(Clone)]
pub struct InitGate {
    inner: Arc<GateInner>,
}

impl InitGate {
    fn new(epoch: u64) -> Self {
        let (state, _) = watch::channel(GateState::Pending);
        Self {
            inner: Arc::new(GateInner { epoch, state }),
        }
    }

    /// Epoch number of this gate (0 for the gate created with the barrier).
    pub fn epoch(&self) -> u64 {
        self.inner.epoch
    }

    /// Current state snapshot.
    pub fn state(&self) -> GateState {
        self.inner.state.borrow().clone()
    }

    /// Returns `true` once the gate has been completed or failed.
    pub fn is_resolved(&self) -> bool {
        self.inner.state.borrow().is_resolved()
    }

    /// Suspends until the gate resolves and returns the resolved state.
    pub async fn resolved(&self) -> GateState {
        let mut rx = self.inner.state.subscribe();
        match rx.wait_for(GateState::is_resolved).await {
            Ok(state) => state.clone(),
            // The sender lives in `inner`, which `self` keeps alive.
            Err(_) => GateState::Failed(Arc::from("gate closed")),
        }
    }

    fn resolve(&self, next: GateState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if state.is_resolved() {
                return false;
            }
            *state = next;
            true
        })
    }
}

impl PartialEq for InitGate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for InitGate {}

impl fmt::Debug for InitGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitGate")
            .field("epoch", &self.epoch())
            .field("state", &self.state())
            .finish()
    }
}

/// Process-wide holder of the current [`InitGate`].
pub struct InitBarrier {
    current: Mutex<InitGate>,
    sink: Arc<dyn ObservabilitySink>,
}

impl InitBarrier {
    /// Creates a barrier whose first gate is pending.
    pub fn new(sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            current: Mutex::new(InitGate::new(0)),
            sink,
        }
    }

    /// Returns the live gate (pending or resolved).
    pub fn current(&self) -> InitGate {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Joins the pending gate, or publishes a fresh one if the current gate is resolved.
    pub fn reserve(&self) -> InitGate {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if !current.is_resolved() {
            return current.clone();
        }
        let next = InitGate::new(current.epoch() + 1);
        *current = next.clone();
        next
    }

    /// Resolves `gate` as ready. Returns `false` if it was already resolved.
    pub fn complete(&self, gate: &InitGate) -> bool {
        gate.resolve(GateState::Ready)
    }

    /// Resolves `gate` as failed. Returns `false` if it was already resolved.
    pub fn fail(&self, gate: &InitGate, reason: impl fmt::Display) -> bool {
        gate.resolve(GateState::Failed(Arc::from(reason.to_string())))
    }

    /// Waits for `gate` without blocking a worker thread.
    ///
    /// `timeout = None` waits without deadline. On expiry an
    /// [`EventKind::InitTimeout`] is reported and [`GateState::Pending`] is
    /// returned; callers continue best-effort.
    pub async fn await_init(
        &self,
        tag: &str,
        gate: &InitGate,
        timeout: Option<Duration>,
    ) -> GateState {
        let state = gate.state();
        if state.is_resolved() {
            return state;
        }
        let Some(limit) = timeout else {
            return gate.resolved().await;
        };
        match tokio::time::timeout(limit, gate.resolved()).await {
            Ok(state) => state,
            Err(_) => {
                let ms = limit.as_millis().to_string();
                let epoch = gate.epoch().to_string();
                self.sink.report_event(
                    tag,
                    EventKind::InitTimeout,
                    "initialization wait timed out",
                    &[("timeout_ms", ms.as_str()), ("epoch", epoch.as_str())],
                );
                GateState::Pending
            }
        }
    }

    /// Waits for `gate`, then runs `block`; a failed gate is returned as
    /// [`CoreError::InitFailed`] and `block` is not run.
    pub async fn with_init_ready<F, Fut, T>(&self, gate: &InitGate, block: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        match gate.resolved().await {
            GateState::Failed(reason) => Err(CoreError::InitFailed {
                reason: reason.to_string(),
            }),
            _ => block().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;

    fn barrier() -> (InitBarrier, Bus) {
        let bus = Bus::new(16);
        (InitBarrier::new(Arc::new(bus.clone())), bus)
    }

    #[test]
    fn reserve_joins_pending_gate_and_renews_after_completion() {
        let (barrier, _) = barrier();

        let a = barrier.reserve();
        let b = barrier.reserve();
        assert_eq!(a, b);
        assert!(!a.is_resolved());

        assert!(barrier.complete(&a));
        assert!(!barrier.complete(&a));

        let c = barrier.reserve();
        assert_ne!(a, c);
        assert!(!c.is_resolved());
        assert_eq!(c.epoch(), a.epoch() + 1);
        assert_eq!(barrier.current(), c);
        assert_eq!(a.state(), GateState::Ready);
    }

    #[test]
    fn resolving_twice_keeps_first_outcome() {
        let (barrier, _) = barrier();
        let gate = barrier.current();

        assert!(barrier.fail(&gate, "db locked"));
        assert!(!barrier.complete(&gate));
        assert_eq!(gate.state(), GateState::Failed(Arc::from("db locked")));
    }

    #[tokio::test]
    async fn waiters_wake_on_completion() {
        let (barrier, _) = barrier();
        let barrier = Arc::new(barrier);
        let gate = barrier.current();

        let waiter = {
            let barrier = barrier.clone();
            let gate = gate.clone();
            tokio::spawn(async move { barrier.await_init("test", &gate, None).await })
        };
        tokio::task::yield_now().await;
        barrier.complete(&gate);

        assert_eq!(waiter.await.unwrap(), GateState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_wait_reports_and_returns() {
        let (barrier, bus) = barrier();
        let mut rx = bus.subscribe();
        let gate = barrier.current();

        let state = barrier
            .await_init("subscription", &gate, Some(Duration::from_secs(7)))
            .await;

        assert_eq!(state, GateState::Pending);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::InitTimeout);
        assert_eq!(ev.attr("timeout_ms"), Some("7000"));
    }

    #[tokio::test]
    async fn with_init_ready_propagates_failure() {
        let (barrier, _) = barrier();
        let gate = barrier.current();
        barrier.fail(&gate, "no config");

        let res = barrier
            .with_init_ready(&gate, || async { Ok::<_, CoreError>(1) })
            .await;
        assert!(matches!(res, Err(CoreError::InitFailed { reason }) if reason == "no config"));

        let ok_gate = barrier.reserve();
        barrier.complete(&ok_gate);
        let res = barrier
            .with_init_ready(&ok_gate, || async { Ok::<_, CoreError>(1) })
            .await;
        assert_eq!(res.unwrap(), 1);
    }
}
