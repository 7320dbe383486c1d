//! # Token update check.
//!
//! [`TokenSync::check_and_update`] compares the resolved push token with the
//! last token the server acknowledged (stored in the configuration row) and
//! sends a token-update request when they differ. On success the new token
//! is recorded with a partial config update.

use std::sync::Arc;

use serde_json::json;

use crate::domains::{Domain, DomainLocks};
use crate::env::EnvironmentFactory;
use crate::error::{CoreError, MissingPrecondition};
use crate::events::ObservabilitySink;
use crate::host::{DurableStore, OutboundRequest, RequestKind, SendOutcome, TransportClient};
use crate::store::ConfigField;

/// Keeps the server's view of the push token current.
pub struct TokenSync {
    store: Arc<dyn DurableStore>,
    transport: Arc<dyn TransportClient>,
    env: EnvironmentFactory,
    locks: Arc<DomainLocks>,
    drop_fatal: bool,
    sink: Arc<dyn ObservabilitySink>,
}

impl TokenSync {
    pub fn new(
        store: Arc<dyn DurableStore>,
        transport: Arc<dyn TransportClient>,
        env: EnvironmentFactory,
        locks: Arc<DomainLocks>,
        drop_fatal: bool,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            store,
            transport,
            env,
            locks,
            drop_fatal,
            sink,
        }
    }

    /// Sends the current token if the server has not acknowledged it yet.
    ///
    /// Returns `true` if the check should run again later. Having no token at
    /// all is not a reason to retry; other failures are reported and retried
    /// when [`CoreError::is_retryable`] holds.
    pub async fn check_and_update(&self) -> bool {
        match self.update().await {
            Ok(needs_retry) => needs_retry,
            Err(err) => {
                self.sink.report_error(Domain::TokenUpdate.as_str(), &err);
                err.is_retryable()
            }
        }
    }

    async fn update(&self) -> Result<bool, CoreError> {
        let env = self.env.create();
        let config = env.config().await?;
        let auth = env.auth().await?;
        let candidate = match env.token().await {
            Ok(candidate) => candidate,
            Err(MissingPrecondition::Token) => return Ok(false),
            Err(other) => return Err(other.into()),
        };

        let _lock = self.locks.lock(Domain::TokenUpdate).await;
        if config.last_token.as_deref() == Some(candidate.token.as_str()) {
            return Ok(false);
        }

        let request = OutboundRequest {
            kind: RequestKind::TokenUpdate,
            endpoint: config.endpoint,
            auth,
            item_id: None,
            payload: json!({
                "token": &candidate.token,
                "provider": candidate.origin.as_str(),
            }),
        };
        match self.transport.send(request).await {
            SendOutcome::Success(_) => {
                self.store
                    .update_config(ConfigField::LastToken(Some(candidate.token)))
                    .await?;
                Ok(false)
            }
            SendOutcome::Fatal(reason) => {
                self.sink.report_error(
                    Domain::TokenUpdate.as_str(),
                    &CoreError::Fatal { reason },
                );
                Ok(!self.drop_fatal)
            }
            SendOutcome::Retryable(reason) => {
                self.sink.report_error(
                    Domain::TokenUpdate.as_str(),
                    &CoreError::Transport { reason },
                );
                Ok(true)
            }
        }
    }
}
