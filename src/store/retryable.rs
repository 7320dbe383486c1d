//! # Error-swallowing durable queue operations.
//!
//! [`RetryableStore`] wraps a [`DurableStore`] for the domains. Every
//! operation catches the backend error, reports it under the item's kind and
//! returns a plain outcome (`bool`, empty `Vec`, `0`). A `false` means "did
//! not happen": callers re-derive state on the next sweep instead of
//! assuming success.

use std::sync::Arc;

use crate::error::StoreError;
use crate::events::{EventKind, ObservabilitySink};
use crate::host::DurableStore;
use crate::store::{WorkItem, WorkKind};

/// Verdict of [`RetryableStore::check_retry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryCheck {
    /// Budget consumed; attempt the item now.
    Attempt,
    /// The counter could not be persisted; leave the item for a later sweep.
    Skip,
    /// Past the ceiling; the item was deleted.
    LimitReached,
}

/// Durable queue operations plus the retry-ceiling decision.
#[derive(Clone)]
pub struct RetryableStore {
    store: Arc<dyn DurableStore>,
    sink: Arc<dyn ObservabilitySink>,
}

impl RetryableStore {
    /// Wraps `store`; failures are reported to `sink`.
    pub fn new(store: Arc<dyn DurableStore>, sink: Arc<dyn ObservabilitySink>) -> Self {
        Self { store, sink }
    }

    /// Underlying store, for configuration-row access.
    pub fn backend(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    /// Persists `item`. Returns `false` if the write did not happen.
    pub async fn insert(&self, item: &WorkItem) -> bool {
        let res = self.store.insert(item).await;
        self.settle(item.kind, res).is_some()
    }

    /// Deletes `item`. Returns `false` if the delete did not happen.
    pub async fn delete(&self, item: &WorkItem) -> bool {
        let res = self.store.delete(item.kind, item.id).await;
        self.settle(item.kind, res).is_some()
    }

    /// Lists the items of `kind` owned by `owner`, oldest first; empty on failure.
    pub async fn enumerate_by_owner(&self, kind: WorkKind, owner: &str) -> Vec<WorkItem> {
        let res = self.store.list_by_owner(kind, owner).await;
        self.settle(kind, res).unwrap_or_default()
    }

    /// Persists `retry_count + 1` and mirrors it into `item`.
    pub async fn increase_retry(&self, item: &mut WorkItem) -> bool {
        let next = item.retry_count.saturating_add(1);
        let res = self.store.set_retry_count(item.kind, item.id, next).await;
        if self.settle(item.kind, res).is_none() {
            return false;
        }
        item.retry_count = next;
        true
    }

    /// Returns `true` if `item` is past its ceiling (and is now deleted).
    ///
    /// Shorthand for [`check_retry`](Self::check_retry) when only exhaustion
    /// matters.
    pub async fn is_retry_limit_exceeded(&self, item: &mut WorkItem) -> bool {
        self.check_retry(item).await == RetryCheck::LimitReached
    }

    /// Decides whether `item` may be attempted in this sweep.
    ///
    /// Past its ceiling the item is reported ([`EventKind::RetryLimitReached`]),
    /// deleted and [`RetryCheck::LimitReached`] is returned. Otherwise its
    /// counter is incremented; if the increment was not persisted the item is
    /// [`RetryCheck::Skip`]ped, so no attempt happens without consuming budget.
    /// Call exactly once per item per sweep pass.
    pub async fn check_retry(&self, item: &mut WorkItem) -> RetryCheck {
        if item.is_exhausted() {
            let id = item.id.to_string();
            self.sink.report_event(
                item.kind.as_str(),
                EventKind::RetryLimitReached,
                "retry limit reached",
                &[("item_id", id.as_str())],
            );
            self.delete(item).await;
            return RetryCheck::LimitReached;
        }
        if self.increase_retry(item).await {
            RetryCheck::Attempt
        } else {
            RetryCheck::Skip
        }
    }

    /// Trims the `kind` table once it holds more than `threshold` rows.
    ///
    /// Deletes the `threshold - trim_to` oldest rows and returns how many
    /// were removed. `threshold = 0` disables the valve.
    pub async fn clear_oldest(&self, kind: WorkKind, threshold: usize, trim_to: usize) -> usize {
        if threshold == 0 {
            return 0;
        }
        let Some(count) = self.settle(kind, self.store.count(kind).await) else {
            return 0;
        };
        if count <= threshold {
            return 0;
        }

        let excess = threshold.saturating_sub(trim_to);
        let res = self.store.delete_oldest(kind, excess).await;
        let removed = self.settle(kind, res).unwrap_or(0);
        if removed > 0 {
            let removed_s = removed.to_string();
            self.sink.report_event(
                kind.as_str(),
                EventKind::QueueTrimmed,
                "event queue trimmed",
                &[("removed", removed_s.as_str())],
            );
        }
        removed
    }

    fn settle<T>(&self, kind: WorkKind, res: Result<T, StoreError>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(err) => {
                self.sink.report_error(kind.as_str(), &err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::host::{MemoryStore, StoreOp};
    use crate::policies::RetryPolicy;
    use serde_json::json;

    fn setup() -> (RetryableStore, Arc<MemoryStore>, Bus) {
        let bus = Bus::new(64);
        let mem = Arc::new(MemoryStore::new());
        (RetryableStore::new(mem.clone(), Arc::new(bus.clone())), mem, bus)
    }

    #[tokio::test]
    async fn item_survives_exactly_its_budget() {
        let (store, mem, bus) = setup();
        let mut rx = bus.subscribe();
        let policy = RetryPolicy::new(1, 4);
        let mut item = WorkItem::new(WorkKind::PushEvent, "u1", json!({}), policy);
        assert!(store.insert(&item).await);

        let mut failures = 0;
        while !store.is_retry_limit_exceeded(&mut item).await {
            // Every attempt fails retryably.
            failures += 1;
        }

        assert_eq!(failures, policy.budget());
        assert_eq!(failures, 4);
        assert_eq!(item.retry_count, 5);
        assert!(mem.snapshot(WorkKind::PushEvent).await.is_empty());

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::RetryLimitReached);
        assert_eq!(ev.attr("item_id"), Some(item.id.to_string().as_str()));
    }

    #[tokio::test]
    async fn floor_above_ceiling_gets_no_attempt() {
        let (store, mem, _) = setup();
        let policy = RetryPolicy::new(4, 2);
        let mut item = WorkItem::new(WorkKind::MobileEvent, "u1", json!({}), policy);
        store.insert(&item).await;

        assert_eq!(policy.budget(), 0);
        assert_eq!(store.check_retry(&mut item).await, RetryCheck::LimitReached);
        assert!(mem.snapshot(WorkKind::MobileEvent).await.is_empty());
    }

    #[tokio::test]
    async fn increment_is_persisted() {
        let (store, mem, _) = setup();
        let mut item = WorkItem::new(WorkKind::Subscription, "u1", json!({}), RetryPolicy::new(0, 5));
        store.insert(&item).await;

        assert!(!store.is_retry_limit_exceeded(&mut item).await);
        assert_eq!(mem.snapshot(WorkKind::Subscription).await[0].retry_count, 1);
    }

    #[tokio::test]
    async fn unpersisted_increment_skips_the_attempt() {
        let (store, mem, _) = setup();
        let mut item = WorkItem::new(WorkKind::PushEvent, "u1", json!({}), RetryPolicy::new(1, 2));
        store.insert(&item).await;
        mem.set_failing_op(StoreOp::SetRetryCount, true);

        for _ in 0..5 {
            assert_eq!(store.check_retry(&mut item).await, RetryCheck::Skip);
        }
        assert_eq!(item.retry_count, 1);
        assert_eq!(mem.snapshot(WorkKind::PushEvent).await[0].retry_count, 1);

        mem.set_failing_op(StoreOp::SetRetryCount, false);
        assert_eq!(store.check_retry(&mut item).await, RetryCheck::Attempt);
        assert_eq!(store.check_retry(&mut item).await, RetryCheck::Attempt);
        assert_eq!(store.check_retry(&mut item).await, RetryCheck::LimitReached);
    }

    #[tokio::test]
    async fn failures_are_reported_and_swallowed() {
        let (store, mem, bus) = setup();
        let mut rx = bus.subscribe();
        let item = WorkItem::new(WorkKind::Subscription, "u1", json!({}), RetryPolicy::default());
        mem.set_failing(true);

        assert!(!store.insert(&item).await);
        assert!(store.enumerate_by_owner(WorkKind::Subscription, "u1").await.is_empty());

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ErrorReported);
        assert_eq!(ev.tag.as_deref(), Some("subscription"));
    }

    #[tokio::test]
    async fn clear_oldest_trims_only_above_threshold() {
        let (store, mem, _) = setup();
        for i in 0..12 {
            let item = WorkItem::new(WorkKind::MobileEvent, "u1", json!({ "n": i }), RetryPolicy::new(1, 5));
            store.insert(&item).await;
        }

        assert_eq!(store.clear_oldest(WorkKind::MobileEvent, 12, 6).await, 0);
        assert_eq!(store.clear_oldest(WorkKind::MobileEvent, 10, 4).await, 6);

        let rest = mem.snapshot(WorkKind::MobileEvent).await;
        assert_eq!(rest.len(), 6);
        assert_eq!(rest[0].payload, json!({ "n": 6 }));
    }
}
