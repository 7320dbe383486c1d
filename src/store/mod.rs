//! Durable work items and the retry policy chokepoint.
//!
//! - [`WorkItem`] a persisted action still owed to the server
//! - [`ConfigRecord`] / [`ConfigField`] the single configuration row
//! - [`RetryableStore`] error-swallowing operations over a
//!   [`DurableStore`](crate::host::DurableStore), including
//!   [`is_retry_limit_exceeded`](RetryableStore::is_retry_limit_exceeded)
//!
//! ## Item lifecycle
//! ```text
//! command ──► insert(retry_count = floor)
//!                 │
//!                 ▼
//!   sweep: is_retry_limit_exceeded?
//!        ├─ retry_count > max ─► RetryLimitReached, delete      (deleted-exhausted)
//!        ├─ increment not persisted ─► skip this sweep          (budget intact)
//!        └─ else retry_count += 1 ─► send
//!                                    ├─ Success   ─► delete     (deleted-success)
//!                                    └─ failure   ─► keep, next sweep
//! ```

mod config;
mod item;
mod retryable;

pub use config::{ConfigField, ConfigRecord};
pub use item::{WorkId, WorkItem, WorkKind};
pub use retryable::{RetryCheck, RetryableStore};
