//! Scheduled worker layer.
//!
//! - [`JobKey`] / [`JobKind`] job identity (`pushvisor.<kind>.<domain>`)
//! - [`JobDispatch`] / [`WorkResult`] callback contract between a scheduler and the runtime
//! - [`PeriodicReconciler`] idempotent periodic scheduling per domain
//! - [`OneShotRetry`] superseding one-shot retry jobs
//! - [`ServiceGuard`] hosting-service self-stop
//! - [`LocalJobRunner`] tokio-backed [`ScheduledJobRunner`](crate::host::ScheduledJobRunner)
//!
//! ## Flow
//! ```text
//! domain command ─► OneShotRetry::schedule(domain) ─► scheduler
//!                                                       │ fires
//!                                                       ▼
//!                         JobDispatch::run_job(pushvisor.one_shot.<domain>)
//!                                                       │
//!                            OneShotRetry::run(sweep) ──┴─► Success | Retry (backoff)
//! ```

mod job;
mod local;
mod one_shot;
mod periodic;
mod service;
#[cfg(test)]
pub(crate) mod testing;

pub use job::{JobDispatch, JobKey, JobKind, WorkResult};
pub use local::LocalJobRunner;
pub use one_shot::OneShotRetry;
pub use periodic::PeriodicReconciler;
pub use service::ServiceGuard;
