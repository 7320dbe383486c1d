//! # Durable store contract.
//!
//! The store must persist work items across process restarts and serialize
//! its own writes. Rows of one kind are enumerated in insertion order.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{ConfigField, ConfigRecord, WorkId, WorkItem, WorkKind};

/// Persistence of work items and of the configuration row.
#[async_trait]
pub trait DurableStore: Send + Sync + 'static {
    /// Inserts an item; an existing row with the same id is replaced.
    async fn insert(&self, item: &WorkItem) -> Result<(), StoreError>;

    /// Deletes an item. Deleting a missing row is not an error.
    async fn delete(&self, kind: WorkKind, id: WorkId) -> Result<(), StoreError>;

    /// Lists the items of `kind` owned by `owner`, oldest first.
    async fn list_by_owner(&self, kind: WorkKind, owner: &str) -> Result<Vec<WorkItem>, StoreError>;

    /// Overwrites the retry counter of an item.
    async fn set_retry_count(&self, kind: WorkKind, id: WorkId, retry_count: u32)
    -> Result<(), StoreError>;

    /// Counts the rows of `kind`.
    async fn count(&self, kind: WorkKind) -> Result<usize, StoreError>;

    /// Deletes the `n` oldest rows of `kind`; returns how many were deleted.
    async fn delete_oldest(&self, kind: WorkKind, n: usize) -> Result<usize, StoreError>;

    /// Reads the configuration row.
    async fn read_config(&self) -> Result<Option<ConfigRecord>, StoreError>;

    /// Inserts or replaces the configuration row.
    async fn write_config(&self, record: &ConfigRecord) -> Result<(), StoreError>;

    /// Deletes the configuration row.
    async fn delete_config(&self) -> Result<(), StoreError>;

    /// Updates one field of the configuration row.
    async fn update_config(&self, field: ConfigField) -> Result<(), StoreError>;
}
