//! Retry and backoff policies.
//!
//! This module groups the knobs that control **how many times** a durable
//! work item is retried and **how long** a scheduler waits between one-shot
//! retry attempts.
//!
//! ## Contents
//! - [`RetryPolicy`]   per-domain retry floor and ceiling of durable items
//! - [`BackoffPolicy`] how one-shot job delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//!
//! ## Quick wiring
//! ```text
//! Config { subscription_retry, push_event_retry, mobile_event_retry: RetryPolicy,
//!          one_shot_backoff: BackoffPolicy }
//!      ├─► DurableDomain stamps new WorkItems with RetryPolicy floor/ceiling
//!      ├─► RetryableStore::is_retry_limit_exceeded enforces the ceiling
//!      └─► OneShotRetry hands one_shot_backoff to ScheduledJobRunner
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
