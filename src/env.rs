//! # Per-invocation environment.
//!
//! An [`Environment`] bundles the four preconditions of a domain operation,
//! each resolved lazily at most once per invocation:
//!
//! ```text
//! config()   ─► store.read_config()           ─► Err(Config)  if no row
//! user_tag() ─► config().user_tag             ─► Err(UserTag) if unset
//! auth()     ─► config().auth_token           ─► Err(Auth)    if unset
//! token()    ─► TokenManager::get_current_token ─► Err(Token) if none
//! ```
//!
//! Build one per operation with [`EnvironmentFactory::create`]; values are
//! never shared across invocations, so a config change is seen by the next one.

use std::sync::Arc;

use anyhow::anyhow;

use crate::error::MissingPrecondition;
use crate::events::ObservabilitySink;
use crate::host::DurableStore;
use crate::store::ConfigRecord;
use crate::sync::SuspendLazy;
use crate::token::{TokenCandidate, TokenManager};

/// Lazily-resolved preconditions of one domain operation.
pub struct Environment {
    config: Arc<SuspendLazy<ConfigRecord>>,
    user_tag: SuspendLazy<String>,
    auth: SuspendLazy<String>,
    token: SuspendLazy<TokenCandidate>,
}

impl Environment {
    /// Configuration row.
    pub async fn config(&self) -> Result<ConfigRecord, MissingPrecondition> {
        self.config.get().await.ok_or(MissingPrecondition::Config)
    }

    /// Owner tag of durable items.
    pub async fn user_tag(&self) -> Result<String, MissingPrecondition> {
        self.user_tag.get().await.ok_or(MissingPrecondition::UserTag)
    }

    /// Auth token for requests.
    pub async fn auth(&self) -> Result<String, MissingPrecondition> {
        self.auth.get().await.ok_or(MissingPrecondition::Auth)
    }

    /// Current push token.
    pub async fn token(&self) -> Result<TokenCandidate, MissingPrecondition> {
        self.token.get().await.ok_or(MissingPrecondition::Token)
    }
}

/// Builds [`Environment`]s over the shared store and token manager.
#[derive(Clone)]
pub struct EnvironmentFactory {
    store: Arc<dyn DurableStore>,
    tokens: Arc<TokenManager>,
    sink: Arc<dyn ObservabilitySink>,
}

impl EnvironmentFactory {
    pub fn new(
        store: Arc<dyn DurableStore>,
        tokens: Arc<TokenManager>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self { store, tokens, sink }
    }

    /// Creates a fresh environment; nothing is resolved until first access.
    pub fn create(&self) -> Environment {
        let store = self.store.clone();
        let config = Arc::new(SuspendLazy::new("env.config", self.sink.clone(), move || {
            let store = store.clone();
            async move {
                store
                    .read_config()
                    .await?
                    .ok_or_else(|| anyhow!(MissingPrecondition::Config))
            }
        }));

        let cfg = config.clone();
        let user_tag = SuspendLazy::new("env.user_tag", self.sink.clone(), move || {
            let cfg = cfg.clone();
            async move {
                cfg.get()
                    .await
                    .and_then(|c| c.user_tag)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| anyhow!(MissingPrecondition::UserTag))
            }
        });

        let cfg = config.clone();
        let auth = SuspendLazy::new("env.auth", self.sink.clone(), move || {
            let cfg = cfg.clone();
            async move {
                cfg.get()
                    .await
                    .and_then(|c| c.auth_token)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| anyhow!(MissingPrecondition::Auth))
            }
        });

        let tokens = self.tokens.clone();
        let token = SuspendLazy::new("env.token", self.sink.clone(), move || {
            let tokens = tokens.clone();
            async move {
                tokens
                    .get_current_token()
                    .await
                    .ok_or_else(|| anyhow!(MissingPrecondition::Token))
            }
        });

        Environment {
            config,
            user_tag,
            auth,
            token,
        }
    }
}
