//! # Token manager.
//!
//! Holds the registered providers, the optional priority list and the manual
//! override, and resolves the current push token on demand.
//!
//! Locks:
//! - `providers`, `priority`, `manual`: short std locks, never held across `.await`
//! - `seen`: the session log; held only across its check-then-insert

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::events::{EventKind, ObservabilitySink};
use crate::token::{ProviderKind, TokenCandidate, TokenOrigin, TokenProvider};

const MAX_PROVIDERS: usize = 3;

/// Resolves the active push token among up to three providers.
pub struct TokenManager {
    providers: RwLock<HashMap<ProviderKind, Arc<dyn TokenProvider>>>,
    priority: RwLock<Option<Vec<ProviderKind>>>,
    manual: RwLock<Option<String>>,
    seen: Mutex<HashSet<String>>,
    attempts: u32,
    interval: Duration,
    sink: Arc<dyn ObservabilitySink>,
}

impl TokenManager {
    /// Creates a manager polling with `config`'s attempts and interval.
    pub fn new(config: &Config, sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            priority: RwLock::new(None),
            manual: RwLock::new(None),
            seen: Mutex::new(HashSet::new()),
            attempts: config.token_poll_attempts.max(1),
            interval: config.token_poll_interval,
            sink,
        }
    }

    /// Registers `provider`, replacing a previous one of the same kind.
    pub fn register_provider(&self, provider: Arc<dyn TokenProvider>) {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.kind(), provider);
    }

    /// Sets the scan order. Duplicates are ignored, at most three entries count.
    pub fn set_priority(&self, order: Vec<ProviderKind>) {
        *self.priority.write().unwrap_or_else(PoisonError::into_inner) = Some(order);
    }

    /// Sets the manual override; an empty token clears it.
    pub fn set_manual_token(&self, token: impl Into<String>) {
        let token = token.into();
        *self.manual.write().unwrap_or_else(PoisonError::into_inner) =
            (!token.is_empty()).then_some(token);
    }

    /// Removes the manual override.
    pub fn clear_manual_token(&self) {
        *self.manual.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Current manual override.
    pub fn manual_token(&self) -> Option<String> {
        self.manual
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `true` when a manual token exists or at least one provider is registered.
    pub fn is_push_active(&self) -> bool {
        self.manual_token().is_some()
            || !self
                .providers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }

    /// Effective scan order: configured (or default) order, deduplicated,
    /// capped at three, registered providers only.
    pub fn scan_order(&self) -> Vec<ProviderKind> {
        let configured = self
            .priority
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| ProviderKind::DEFAULT_ORDER.to_vec());
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let mut order = Vec::with_capacity(MAX_PROVIDERS);
        for kind in configured {
            if order.len() == MAX_PROVIDERS {
                break;
            }
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        order.retain(|kind| providers.contains_key(kind));
        order
    }

    /// Resolves the current token and announces it if it is new this session.
    pub async fn get_current_token(&self) -> Option<TokenCandidate> {
        let candidate = self.resolve().await?;
        self.announce(&candidate).await;
        Some(candidate)
    }

    /// Polls `kind` until it yields a non-empty token or the attempts run out.
    ///
    /// No pause follows the last attempt. Provider errors are reported and
    /// count as an empty attempt.
    pub async fn get_non_empty_token(&self, kind: ProviderKind) -> Option<String> {
        let provider = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()?;

        for attempt in 1..=self.attempts {
            match provider.fetch_token().await {
                Ok(Some(token)) if !token.is_empty() => return Some(token),
                Ok(_) => {}
                Err(err) => self.sink.report_error(kind.as_str(), &err),
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        tracing::debug!(target: "pushvisor", provider = kind.as_str(), "no token after polling");
        None
    }

    async fn resolve(&self) -> Option<TokenCandidate> {
        if let Some(token) = self.manual_token() {
            return Some(TokenCandidate::new(TokenOrigin::Manual, token));
        }
        for kind in self.scan_order() {
            if let Some(token) = self.get_non_empty_token(kind).await {
                return Some(TokenCandidate::new(TokenOrigin::Provider(kind), token));
            }
        }
        None
    }

    async fn announce(&self, candidate: &TokenCandidate) {
        let mut seen = self.seen.lock().await;
        if !seen.insert(candidate.token.clone()) {
            return;
        }
        drop(seen);
        self.sink.report_event(
            "token",
            EventKind::TokenAcquired,
            "token acquired",
            &[("provider", candidate.origin.as_str())],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        kind: ProviderKind,
        token: StdMutex<anyhow::Result<Option<String>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(kind: ProviderKind, token: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                token: StdMutex::new(Ok(Some(token.to_string()))),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                token: StdMutex::new(Err(anyhow::anyhow!("service unavailable"))),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, token: &str) {
            *self.token.lock().unwrap() = Ok(Some(token.to_string()));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenProvider for Scripted {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn fetch_token(&self) -> anyhow::Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &*self.token.lock().unwrap() {
                Ok(token) => Ok(token.clone()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }
    }

    fn manager() -> (TokenManager, Bus) {
        let bus = Bus::new(64);
        (TokenManager::new(&Config::default(), Arc::new(bus.clone())), bus)
    }

    #[tokio::test(start_paused = true)]
    async fn first_non_empty_provider_wins_and_later_ones_are_skipped() {
        let (tm, _) = manager();
        let a = Scripted::new(ProviderKind::Firebase, "");
        let b = Scripted::new(ProviderKind::Huawei, "tok-B");
        let c = Scripted::new(ProviderKind::RuStore, "tok-C");
        tm.register_provider(a.clone());
        tm.register_provider(b.clone());
        tm.register_provider(c.clone());
        tm.set_priority(vec![ProviderKind::Firebase, ProviderKind::Huawei, ProviderKind::RuStore]);

        let started = tokio::time::Instant::now();
        let got = tm.get_current_token().await.unwrap();

        assert_eq!(got.token, "tok-B");
        assert_eq!(got.origin, TokenOrigin::Provider(ProviderKind::Huawei));
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0);
        // Two pauses between three attempts on A, none after the last one.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn announces_each_distinct_value_once() {
        let (tm, bus) = manager();
        let mut rx = bus.subscribe();
        let p = Scripted::new(ProviderKind::Firebase, "t1");
        tm.register_provider(p.clone());

        tm.get_current_token().await;
        tm.get_current_token().await;
        p.set("t2");
        tm.get_current_token().await;

        let mut acquired = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::TokenAcquired {
                acquired += 1;
                assert_eq!(ev.attr("provider"), Some("firebase"));
            }
        }
        assert_eq!(acquired, 2);
    }

    #[tokio::test]
    async fn manual_token_short_circuits_providers() {
        let (tm, _) = manager();
        let p = Scripted::new(ProviderKind::Firebase, "from-provider");
        tm.register_provider(p.clone());
        tm.set_manual_token("manual");

        let got = tm.get_current_token().await.unwrap();
        assert_eq!(got, TokenCandidate::new(TokenOrigin::Manual, "manual"));
        assert_eq!(p.calls(), 0);

        tm.clear_manual_token();
        assert_eq!(tm.get_current_token().await.unwrap().token, "from-provider");
    }

    #[tokio::test(start_paused = true)]
    async fn provider_errors_are_reported_and_count_as_empty() {
        let (tm, bus) = manager();
        let mut rx = bus.subscribe();
        let p = Scripted::failing(ProviderKind::RuStore);
        tm.register_provider(p.clone());

        assert_eq!(tm.get_current_token().await, None);
        assert_eq!(p.calls(), 3);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ErrorReported);
        assert_eq!(ev.tag.as_deref(), Some("rustore"));
    }

    #[test]
    fn scan_order_dedups_and_skips_unregistered() {
        let (tm, _) = manager();
        assert!(!tm.is_push_active());
        tm.register_provider(Scripted::new(ProviderKind::Huawei, "h"));
        tm.register_provider(Scripted::new(ProviderKind::Firebase, "f"));
        assert!(tm.is_push_active());

        assert_eq!(tm.scan_order(), vec![ProviderKind::Firebase, ProviderKind::Huawei]);

        tm.set_priority(vec![
            ProviderKind::RuStore,
            ProviderKind::Huawei,
            ProviderKind::Huawei,
            ProviderKind::Firebase,
        ]);
        assert_eq!(tm.scan_order(), vec![ProviderKind::Huawei, ProviderKind::Firebase]);
    }
}
