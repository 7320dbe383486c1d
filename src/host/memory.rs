//! # In-memory durable store.
//!
//! [`MemoryStore`] keeps rows in insertion order per [`WorkKind`]. It is
//! process-local (nothing survives a restart) and is meant for tests and for
//! embedders that bring their own persistence later.
//!
//! [`set_failing`](MemoryStore::set_failing) makes every operation fail with
//! [`StoreError::Backend`]; [`set_failing_op`](MemoryStore::set_failing_op)
//! does the same for a single [`StoreOp`]. Both exist to exercise error paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::host::DurableStore;
use crate::store::{ConfigField, ConfigRecord, WorkId, WorkItem, WorkKind};

#[derive(Default)]
struct Tables {
    items: HashMap<WorkKind, Vec<WorkItem>>,
    config: Option<ConfigRecord>,
}

/// One [`DurableStore`] operation, addressed by failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Insert,
    Delete,
    ListByOwner,
    SetRetryCount,
    Count,
    DeleteOldest,
    ReadConfig,
    WriteConfig,
    DeleteConfig,
    UpdateConfig,
}

/// Process-local [`DurableStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: AtomicBool,
    failing_ops: Mutex<HashSet<StoreOp>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of every row of `kind`, oldest first.
    pub async fn snapshot(&self, kind: WorkKind) -> Vec<WorkItem> {
        self.tables
            .read()
            .await
            .items
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes `op` fail (`true`) or succeed (`false`), independently of
    /// [`set_failing`](MemoryStore::set_failing).
    pub fn set_failing_op(&self, op: StoreOp, failing: bool) {
        let mut ops = self.failing_ops.lock().unwrap_or_else(PoisonError::into_inner);
        if failing {
            ops.insert(op);
        } else {
            ops.remove(&op);
        }
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        let op_failing = self
            .failing_ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op);
        if op_failing || self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn insert(&self, item: &WorkItem) -> Result<(), StoreError> {
        self.check(StoreOp::Insert)?;
        let mut tables = self.tables.write().await;
        let rows = tables.items.entry(item.kind).or_default();
        match rows.iter_mut().find(|row| row.id == item.id) {
            Some(row) => *row = item.clone(),
            None => rows.push(item.clone()),
        }
        Ok(())
    }

    async fn delete(&self, kind: WorkKind, id: WorkId) -> Result<(), StoreError> {
        self.check(StoreOp::Delete)?;
        if let Some(rows) = self.tables.write().await.items.get_mut(&kind) {
            rows.retain(|row| row.id != id);
        }
        Ok(())
    }

    async fn list_by_owner(&self, kind: WorkKind, owner: &str) -> Result<Vec<WorkItem>, StoreError> {
        self.check(StoreOp::ListByOwner)?;
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(&kind)
            .map(|rows| rows.iter().filter(|row| row.owner == owner).cloned().collect())
            .unwrap_or_default())
    }

    async fn set_retry_count(
        &self,
        kind: WorkKind,
        id: WorkId,
        retry_count: u32,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::SetRetryCount)?;
        let mut tables = self.tables.write().await;
        let row = tables
            .items
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|row| row.id == id))
            .ok_or(StoreError::NotFound)?;
        row.retry_count = retry_count;
        Ok(())
    }

    async fn count(&self, kind: WorkKind) -> Result<usize, StoreError> {
        self.check(StoreOp::Count)?;
        Ok(self
            .tables
            .read()
            .await
            .items
            .get(&kind)
            .map_or(0, Vec::len))
    }

    async fn delete_oldest(&self, kind: WorkKind, n: usize) -> Result<usize, StoreError> {
        self.check(StoreOp::DeleteOldest)?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.items.get_mut(&kind) else {
            return Ok(0);
        };
        let n = n.min(rows.len());
        rows.drain(..n);
        Ok(n)
    }

    async fn read_config(&self) -> Result<Option<ConfigRecord>, StoreError> {
        self.check(StoreOp::ReadConfig)?;
        Ok(self.tables.read().await.config.clone())
    }

    async fn write_config(&self, record: &ConfigRecord) -> Result<(), StoreError> {
        self.check(StoreOp::WriteConfig)?;
        self.tables.write().await.config = Some(record.clone());
        Ok(())
    }

    async fn delete_config(&self) -> Result<(), StoreError> {
        self.check(StoreOp::DeleteConfig)?;
        self.tables.write().await.config = None;
        Ok(())
    }

    async fn update_config(&self, field: ConfigField) -> Result<(), StoreError> {
        self.check(StoreOp::UpdateConfig)?;
        let mut tables = self.tables.write().await;
        let record = tables.config.as_mut().ok_or(StoreError::NotFound)?;
        record.apply(field);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::RetryPolicy;
    use serde_json::json;

    #[tokio::test]
    async fn keeps_insertion_order_and_trims_oldest() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..4 {
            let item = WorkItem::new(WorkKind::MobileEvent, "u1", json!({ "n": i }), RetryPolicy::new(1, 3));
            ids.push(item.id);
            store.insert(&item).await.unwrap();
        }

        assert_eq!(store.delete_oldest(WorkKind::MobileEvent, 3).await.unwrap(), 3);
        let rest = store.list_by_owner(WorkKind::MobileEvent, "u1").await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, ids[3]);
    }

    #[tokio::test]
    async fn partial_config_update_requires_row() {
        let store = MemoryStore::new();
        assert_eq!(
            store.update_config(ConfigField::LastToken(Some("t".into()))).await,
            Err(StoreError::NotFound)
        );

        store.write_config(&ConfigRecord::default()).await.unwrap();
        store
            .update_config(ConfigField::LastToken(Some("t".into())))
            .await
            .unwrap();
        let record = store.read_config().await.unwrap().unwrap();
        assert_eq!(record.last_token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn injected_failure_hits_every_operation() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(store.count(WorkKind::Subscription).await.is_err());
        assert!(store.read_config().await.is_err());
        store.set_failing(false);
        assert_eq!(store.count(WorkKind::Subscription).await, Ok(0));
    }

    #[tokio::test]
    async fn single_operation_failure_leaves_others_working() {
        let store = MemoryStore::new();
        store.set_failing_op(StoreOp::WriteConfig, true);
        assert!(store.write_config(&ConfigRecord::default()).await.is_err());
        assert_eq!(store.read_config().await, Ok(None));

        store.set_failing_op(StoreOp::WriteConfig, false);
        assert!(store.write_config(&ConfigRecord::default()).await.is_ok());
    }
}
