use std::fmt;

use async_trait::async_trait;

use crate::domains::Domain;

const PREFIX: &str = "pushvisor";

/// Kind of background job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Reconciliation job running on a fixed interval.
    Periodic,
    /// Retry job scheduled after a domain command.
    OneShot,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Periodic => "periodic",
            JobKind::OneShot => "one_shot",
        }
    }
}

/// Identity of a background job: its kind and domain.
///
/// Rendered as `pushvisor.<kind>.<domain>`, which is both the periodic job
/// name and the one-shot job tag handed to the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub kind: JobKind,
    pub domain: Domain,
}

impl JobKey {
    pub fn periodic(domain: Domain) -> Self {
        Self {
            kind: JobKind::Periodic,
            domain,
        }
    }

    pub fn one_shot(domain: Domain) -> Self {
        Self {
            kind: JobKind::OneShot,
            domain,
        }
    }

    /// Scheduler-facing name.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Parses a scheduler-facing name back into a key.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(PREFIX)?.strip_prefix('.')?;
        let (kind, domain) = rest.split_once('.')?;
        let kind = match kind {
            "periodic" => JobKind::Periodic,
            "one_shot" => JobKind::OneShot,
            _ => return None,
        };
        Some(Self {
            kind,
            domain: Domain::parse(domain)?,
        })
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}.{}.{}", self.kind.as_str(), self.domain.as_str())
    }
}

/// Result a job hands back to its scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkResult {
    /// Nothing left to do.
    Success,
    /// Run again after the scheduler's backoff.
    Retry,
}

impl From<bool> for WorkResult {
    /// `needs_retry` → [`WorkResult`].
    fn from(needs_retry: bool) -> Self {
        if needs_retry {
            WorkResult::Retry
        } else {
            WorkResult::Success
        }
    }
}

/// Entry point the scheduler calls when a job fires.
#[async_trait]
pub trait JobDispatch: Send + Sync + 'static {
    async fn run_job(&self, key: JobKey) -> WorkResult;
}
