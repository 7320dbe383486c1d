//! # App lifecycle signal.
//!
//! [`LifecycleSignal`] exposes the host's foreground state. Subscribing is
//! taking a [`watch::Receiver`]; unsubscribing is dropping it.

use tokio::sync::watch;

/// Source of the host application's foreground/background state.
pub trait LifecycleSignal: Send + Sync + 'static {
    /// Returns `true` while the app is user-visible.
    fn is_foreground_now(&self) -> bool;

    /// Returns a receiver observing foreground transitions (`true` = foreground).
    fn watch_foreground(&self) -> watch::Receiver<bool>;
}

/// `watch`-backed lifecycle signal driven by the host.
///
/// The host calls [`set_foreground`](HostLifecycle::set_foreground) from its
/// own lifecycle callbacks.
#[derive(Debug)]
pub struct HostLifecycle {
    tx: watch::Sender<bool>,
}

impl HostLifecycle {
    /// Creates a signal with the given initial state.
    pub fn new(foreground: bool) -> Self {
        let (tx, _) = watch::channel(foreground);
        Self { tx }
    }

    /// Publishes a state transition; repeated identical states are not re-published.
    pub fn set_foreground(&self, foreground: bool) {
        self.tx.send_if_modified(|current| {
            if *current == foreground {
                return false;
            }
            *current = foreground;
            true
        });
    }
}

impl LifecycleSignal for HostLifecycle {
    fn is_foreground_now(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch_foreground(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
