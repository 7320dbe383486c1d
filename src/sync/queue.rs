//! # Ordered command queues.
//!
//! A [`CommandQueue`] is an unbounded FIFO channel drained by exactly one
//! background worker. Commands of one queue never overlap and complete in
//! submission order; a failing or panicking command is reported and the
//! worker moves on to the next one.
//!
//! ```text
//! submit(cmd) ──► [unbounded mpsc] ──► worker: loop {
//!  (non-blocking)                         cmd.await (catch_unwind)
//!                                           ├─ Ok        ─► next
//!                                           ├─ Err(e)    ─► CommandFailed{error=label}, next
//!                                           └─ panic     ─► CommandFailed, next
//!                                       }
//! ```
//!
//! [`CommandQueues`] bundles the three process-wide instances (init,
//! subscription, mobile-event). There is no ordering across queues.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::{CoreError, SubmitError};
use crate::events::{EventKind, ObservabilitySink};
use crate::subscribers::panic_message;

/// A unit of work accepted by a [`CommandQueue`].
pub type Command = BoxFuture<'static, Result<(), CoreError>>;

/// Single-consumer FIFO command loop.
pub struct CommandQueue {
    name: &'static str,
    tx: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    /// Creates the queue and spawns its worker. Must be called inside a tokio runtime.
    pub fn spawn(name: &'static str, sink: Arc<dyn ObservabilitySink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        let worker = tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                let (reason, label) = match std::panic::AssertUnwindSafe(cmd).catch_unwind().await {
                    Ok(Ok(())) => continue,
                    Ok(Err(err)) => (err.to_string(), err.as_label()),
                    Err(panic) => (format!("panic: {}", panic_message(&*panic)), "panic"),
                };
                sink.report_event(name, EventKind::CommandFailed, &reason, &[("error", label)]);
            }
        });

        Self {
            name,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue name (used as event tag).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueues `cmd` without waiting for it.
    pub fn submit<F>(&self, cmd: F) -> Result<(), SubmitError>
    where
        F: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx.send(cmd.boxed()).map_err(|_| SubmitError::Closed),
            None => Err(SubmitError::Closed),
        }
    }

    /// Stops accepting commands and waits for the queued ones to finish.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

/// Identifies one of the three process-wide command queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// SDK initialization.
    Init,
    /// Subscription, push-event and token-update commands.
    Subscription,
    /// Mobile-event commands.
    MobileEvent,
}

/// The three process-wide command queues.
pub struct CommandQueues {
    init: CommandQueue,
    subscription: CommandQueue,
    mobile_event: CommandQueue,
}

impl CommandQueues {
    /// Spawns all three queues.
    pub fn spawn(sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            init: CommandQueue::spawn("queue.init", sink.clone()),
            subscription: CommandQueue::spawn("queue.subscription", sink.clone()),
            mobile_event: CommandQueue::spawn("queue.mobile_event", sink),
        }
    }

    /// Returns the queue of the given kind.
    pub fn get(&self, kind: QueueKind) -> &CommandQueue {
        match kind {
            QueueKind::Init => &self.init,
            QueueKind::Subscription => &self.subscription,
            QueueKind::MobileEvent => &self.mobile_event,
        }
    }

    /// Shuts every queue down, draining pending commands.
    pub async fn shutdown(&self) {
        self.init.shutdown().await;
        self.subscription.shutdown().await;
        self.mobile_event.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_in_submission_order_despite_failures() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let queue = CommandQueue::spawn("test", Arc::new(bus));
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..6u32 {
            let log = log.clone();
            queue
                .submit(async move {
                    // Earlier items sleep longer; ordering must still hold.
                    tokio::time::sleep(Duration::from_millis(u64::from(6 - i))).await;
                    log.lock().unwrap().push(i);
                    match i {
                        2 => Err(CoreError::Transport { reason: "503".into() }),
                        4 => panic!("item four"),
                        _ => Ok(()),
                    }
                })
                .unwrap();
        }
        queue.shutdown().await;

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::CommandFailed);
        assert_eq!(first.tag.as_deref(), Some("test"));
        assert_eq!(first.attr("error"), Some("transport_failed"));
        let second = rx.recv().await.unwrap();
        assert!(second.reason.as_deref().unwrap().contains("item four"));
        assert_eq!(second.attr("error"), Some("panic"));
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let queue = CommandQueue::spawn("closed", Arc::new(Bus::new(4)));
        queue.shutdown().await;
        assert_eq!(queue.submit(async { Ok(()) }), Err(SubmitError::Closed));
    }
}
