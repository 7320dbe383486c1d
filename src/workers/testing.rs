//! Recording scheduler shared by the worker and orchestrator tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SchedulerError;
use crate::host::{JobState, ScheduledJobRunner};
use crate::policies::BackoffPolicy;

/// Records every call in order and keeps job states in a map.
#[derive(Default)]
pub(crate) struct Recording {
    calls: Mutex<Vec<String>>,
    states: Mutex<HashMap<String, JobState>>,
}

impl Recording {
    /// Calls so far, as `periodic:<name>:<replace>`, `one_shot:<tag>`, `cancel:<tag>`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn set_state(&self, name: &str, state: JobState) {
        self.states.lock().unwrap().insert(name.to_string(), state);
    }
}

#[async_trait]
impl ScheduledJobRunner for Recording {
    async fn schedule_unique_periodic(
        &self,
        name: &str,
        _interval: Duration,
        replace_if_exists: bool,
    ) -> Result<(), SchedulerError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("periodic:{name}:{replace_if_exists}"));
        self.set_state(name, JobState::Enqueued);
        Ok(())
    }

    async fn schedule_one_shot(&self, tag: &str, _backoff: BackoffPolicy) -> Result<(), SchedulerError> {
        self.calls.lock().unwrap().push(format!("one_shot:{tag}"));
        Ok(())
    }

    async fn cancel_by_tag(&self, tag: &str) -> Result<(), SchedulerError> {
        self.calls.lock().unwrap().push(format!("cancel:{tag}"));
        Ok(())
    }

    async fn query_state(&self, name: &str) -> Result<Option<JobState>, SchedulerError> {
        Ok(self.states.lock().unwrap().get(name).copied())
    }
}
