//! # Memoized asynchronous value.
//!
//! [`SuspendLazy`] runs its initializer at most once per successful value:
//!
//! ```text
//! get() ─► lock slot ─┬─ Some(v) ─────────────────────────► Some(v)
//!                     ├─ a concurrent run failed meanwhile ─► None
//!                     └─ run initializer (lock held)
//!                           ├─ Ok(v)  ─► memoize ─────────► Some(v)
//!                           ├─ Err(e) ─► report, clear ───► None
//!                           └─ dropped (cancelled) ─► slot stays empty,
//!                                                     next get() re-runs
//! ```
//!
//! Callers that queued behind a failing run share its cleared state and get
//! `None` without re-running the initializer.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::events::ObservabilitySink;

type Initializer<T> = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Thread-safe, memoized asynchronous value cell.
pub struct SuspendLazy<T> {
    tag: &'static str,
    init: Initializer<T>,
    slot: Mutex<Option<T>>,
    failures: AtomicU64,
    sink: Arc<dyn ObservabilitySink>,
}

impl<T> SuspendLazy<T>
where
    T: Clone + Send + 'static,
{
    /// Creates an empty cell; `init` runs on the first [`get`](Self::get).
    ///
    /// Initializer failures are reported to `sink` under `tag`.
    pub fn new<F, Fut>(tag: &'static str, sink: Arc<dyn ObservabilitySink>, init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            tag,
            init: Box::new(move || init().boxed()),
            slot: Mutex::new(None),
            failures: AtomicU64::new(0),
            sink,
        }
    }

    /// Returns the memoized value, running the initializer if needed.
    ///
    /// Never fails: initializer errors are reported and yield `None`.
    pub async fn get(&self) -> Option<T> {
        let observed = self.failures.load(Ordering::Acquire);
        let mut slot = self.slot.lock().await;

        if let Some(value) = slot.as_ref() {
            return Some(value.clone());
        }
        if self.failures.load(Ordering::Acquire) != observed {
            return None;
        }

        match (self.init)().await {
            Ok(value) => {
                *slot = Some(value.clone());
                Some(value)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::AcqRel);
                drop(slot);
                self.sink.report_error(self.tag, &err);
                None
            }
        }
    }

    /// Returns the memoized value without running the initializer.
    pub fn peek(&self) -> Option<T> {
        self.slot.try_lock().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Bus, EventKind};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting<T: Clone + Send + 'static>(
        calls: Arc<AtomicUsize>,
        delay: Duration,
        out: impl Fn(usize) -> anyhow::Result<T> + Send + Sync + 'static,
    ) -> SuspendLazy<T> {
        let out = Arc::new(out);
        SuspendLazy::new("lazy", Arc::new(Bus::new(16)), move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let out = out.clone();
            async move {
                tokio::time::sleep(delay).await;
                out(n)
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(calls.clone(), Duration::from_millis(50), |_| Ok(7u32));

        let results = futures::future::join_all((0..5).map(|_| lazy.get())).await;

        assert!(results.iter().all(|r| *r == Some(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.get().await, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_shared_and_retried_later() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let lazy: SuspendLazy<u32> = SuspendLazy::new("cfg", Arc::new(bus), move || {
            c.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(anyhow::anyhow!("no row"))
            }
        });

        let results = futures::future::join_all((0..3).map(|_| lazy.get())).await;
        assert_eq!(results, vec![None, None, None]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ErrorReported);
        assert_eq!(ev.tag.as_deref(), Some("cfg"));

        assert_eq!(lazy.get().await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_initializer_is_rerun() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(calls.clone(), Duration::from_secs(1), |n| Ok(n));

        let cancelled = tokio::time::timeout(Duration::from_millis(100), lazy.get()).await;
        assert!(cancelled.is_err());
        assert_eq!(lazy.peek(), None);

        assert_eq!(lazy.get().await, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
