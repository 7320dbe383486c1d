use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::policies::RetryPolicy;

/// Unique identifier of a [`WorkItem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkId(Uuid);

impl WorkId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of durable work item.
///
/// Subscriptions live in the subscription-request table; push and mobile
/// events share the event-request table, partitioned by channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    /// Subscription request.
    Subscription,
    /// Event request on the push channel.
    PushEvent,
    /// Event request on the mobile channel.
    MobileEvent,
}

impl WorkKind {
    /// Returns `true` for event-request rows.
    pub fn is_event(&self) -> bool {
        matches!(self, WorkKind::PushEvent | WorkKind::MobileEvent)
    }

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Subscription => "subscription",
            WorkKind::PushEvent => "push_event",
            WorkKind::MobileEvent => "mobile_event",
        }
    }
}

/// A persisted action still owed to the server.
///
/// `retry_count` only grows; once it exceeds `max_retry_count` the item is
/// deleted and its id is never reused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkId,
    pub kind: WorkKind,
    /// Owner tag (user tag of the installation that created the item).
    pub owner: String,
    /// Opaque request body.
    pub payload: Value,
    pub retry_count: u32,
    pub max_retry_count: u32,
    /// Creation time, milliseconds since the UNIX epoch.
    pub created_at_ms: u64,
}

impl WorkItem {
    /// Creates an item stamped with the policy's floor and ceiling.
    pub fn new(kind: WorkKind, owner: impl Into<String>, payload: Value, policy: RetryPolicy) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            id: WorkId::generate(),
            kind,
            owner: owner.into(),
            payload,
            retry_count: policy.initial_retry,
            max_retry_count: policy.max_retries,
            created_at_ms,
        }
    }

    /// Returns `true` once the item has crossed its retry ceiling.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count > self.max_retry_count
    }
}
