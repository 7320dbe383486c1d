//! Error types used by the pushvisor runtime and its domain operations.
//!
//! This module defines:
//!
//! - [`MissingPrecondition`]: a dependency of an [`Environment`](crate::Environment) is absent.
//! - [`StoreError`]: the durable store rejected or failed an operation.
//! - [`SchedulerError`]: the host job scheduler failed an operation.
//! - [`SubmitError`]: a command could not be enqueued.
//! - [`CoreError`]: the umbrella error of a domain operation.
//! - [`BuildError`]: an [`SdkBuilder`](crate::SdkBuilder) lacks a collaborator.
//!
//! The domain-facing enums provide `as_label` (stable snake_case label for logs/events).
//! [`CoreError`] additionally exposes [`CoreError::is_retryable`].

use thiserror::Error;

/// # A precondition of a domain operation is not available.
///
/// Returned by the [`Environment`](crate::Environment) accessors, one variant
/// per lazily-resolved dependency.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPrecondition {
    /// No configuration row has been written yet (SDK not initialized).
    #[error("configuration is missing")]
    Config,
    /// The configuration carries no user tag (owner of durable items).
    #[error("user tag is missing")]
    UserTag,
    /// No push token could be resolved from the manual override or providers.
    #[error("push token is missing")]
    Token,
    /// The configuration carries no auth token.
    #[error("auth token is missing")]
    Auth,
}

impl MissingPrecondition {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use pushvisor::MissingPrecondition;
    ///
    /// assert_eq!(MissingPrecondition::Token.as_label(), "missing_token");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            MissingPrecondition::Config => "missing_config",
            MissingPrecondition::UserTag => "missing_user_tag",
            MissingPrecondition::Token => "missing_token",
            MissingPrecondition::Auth => "missing_auth",
        }
    }
}

/// # Errors produced by a [`DurableStore`](crate::host::DurableStore).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The storage backend failed (I/O, constraint, corruption...).
    #[error("store backend failure: {reason}")]
    Backend {
        /// Backend-provided description.
        reason: String,
    },
    /// The addressed row does not exist.
    #[error("row not found")]
    NotFound,
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Backend { .. } => "store_backend",
            StoreError::NotFound => "store_not_found",
        }
    }
}

/// # Errors produced by a [`ScheduledJobRunner`](crate::host::ScheduledJobRunner).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler refused the request.
    #[error("scheduler rejected {name}: {reason}")]
    Rejected {
        /// Job name or tag.
        name: String,
        /// Scheduler-provided description.
        reason: String,
    },
    /// The scheduler has been shut down.
    #[error("scheduler is closed")]
    Closed,
}

/// Error returned when submitting a command to a [`CommandQueue`](crate::CommandQueue).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The queue consumer has been shut down.
    #[error("command queue closed")]
    Closed,
}

/// # Errors returned by [`SdkBuilder::build`](crate::SdkBuilder::build).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// A required collaborator was not provided.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// # Errors produced by domain operations.
///
/// Some errors are retryable (`Transport`, `Store`, `Scheduler`), the others
/// describe a state retrying cannot fix.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// A lazily-resolved dependency is absent.
    #[error(transparent)]
    Missing(#[from] MissingPrecondition),

    /// Durable store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Host scheduler failure.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Transport reported a transient failure.
    #[error("transport failed: {reason}")]
    Transport {
        /// Transport-provided description.
        reason: String,
    },

    /// Transport reported a failure that can never succeed.
    #[error("fatal transport error: {reason}")]
    Fatal {
        /// Transport-provided description.
        reason: String,
    },

    /// The initialization gate resolved with a failure.
    #[error("initialization failed: {reason}")]
    InitFailed {
        /// Failure reason recorded on the gate.
        reason: String,
    },

    /// The operation was cancelled before completion.
    #[error("operation cancelled")]
    Canceled,
}

impl CoreError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use pushvisor::CoreError;
    ///
    /// let err = CoreError::Transport { reason: "503".into() };
    /// assert_eq!(err.as_label(), "transport_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CoreError::Missing(m) => m.as_label(),
            CoreError::Store(s) => s.as_label(),
            CoreError::Scheduler(_) => "scheduler_failed",
            CoreError::Transport { .. } => "transport_failed",
            CoreError::Fatal { .. } => "transport_fatal",
            CoreError::InitFailed { .. } => "init_failed",
            CoreError::Canceled => "canceled",
        }
    }

    /// Indicates whether retrying the operation later may succeed.
    ///
    /// Missing preconditions count as retryable: the configuration row and
    /// tokens appear once initialization completes. Fatal transport errors,
    /// a failed initialization gate and cancellation do not.
    ///
    /// # Example
    /// ```
    /// use pushvisor::{CoreError, MissingPrecondition};
    ///
    /// assert!(CoreError::Transport { reason: "timeout".into() }.is_retryable());
    /// assert!(CoreError::Missing(MissingPrecondition::Config).is_retryable());
    /// assert!(!CoreError::Fatal { reason: "400".into() }.is_retryable());
    /// assert!(!CoreError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Missing(_)
                | CoreError::Transport { .. }
                | CoreError::Store(_)
                | CoreError::Scheduler(_)
        )
    }
}
