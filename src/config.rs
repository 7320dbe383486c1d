//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings of the pushvisor runtime.
//!
//! Config is consumed in three places:
//! 1. **Sdk creation**: `Sdk::builder(config)`
//! 2. **Primitives**: init wait timeout, token polling, queue trimming
//! 3. **Worker layer**: periodic interval, one-shot backoff, service shutdown
//!
//! ## Sentinel values
//! - `init_timeout = 0s` → wait for initialization without deadline
//! - `event_queue_threshold = 0` → safety valve disabled

use std::time::Duration;

use crate::domains::Domain;
use crate::policies::{BackoffPolicy, JitterPolicy, RetryPolicy};

/// Global configuration for the pushvisor runtime.
///
/// ## Field semantics
/// - `init_timeout`: Max wait of a queued command for the init gate (`0s` = unbounded)
/// - `token_poll_attempts` / `token_poll_interval`: bounded polling per token provider
/// - `periodic_interval`: interval of every domain's periodic reconciliation job
/// - `one_shot_backoff`: backoff handed to the scheduler for one-shot retry jobs
/// - `*_retry`: per-domain retry floor/ceiling
/// - `event_queue_threshold` / `event_queue_trim_to`: mobile-event table safety valve
/// - `background_settle`: pause before a one-shot sweep while backgrounded
/// - `service_retry_threshold` / `service_stop_delay`: hosting-service self-stop
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time a queued command waits for initialization to resolve.
    ///
    /// On expiry an `InitTimeout` event is emitted and the command proceeds
    /// best-effort.
    pub init_timeout: Duration,

    /// Attempts per token provider before moving to the next one.
    pub token_poll_attempts: u32,

    /// Pause between two empty attempts against the same provider.
    pub token_poll_interval: Duration,

    /// Interval of periodic reconciliation jobs.
    pub periodic_interval: Duration,

    /// Backoff policy passed to the scheduler for one-shot retry jobs.
    pub one_shot_backoff: BackoffPolicy,

    /// Retry floor/ceiling for subscription requests.
    pub subscription_retry: RetryPolicy,

    /// Retry floor/ceiling for push-event requests.
    pub push_event_retry: RetryPolicy,

    /// Retry floor/ceiling for mobile-event requests.
    pub mobile_event_retry: RetryPolicy,

    /// Row count above which the mobile-event table is trimmed.
    pub event_queue_threshold: usize,

    /// Row count the mobile-event table is trimmed down to.
    pub event_queue_trim_to: usize,

    /// Pause before a one-shot sweep runs while the app is backgrounded.
    pub background_settle: Duration,

    /// Attempts a hosting service may make before it stops itself.
    pub service_retry_threshold: u32,

    /// Delay between the stop decision and the actual service stop.
    pub service_stop_delay: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the init wait timeout as an `Option`.
    ///
    /// - `None` → wait without deadline
    /// - `Some(d)` → bounded wait
    #[inline]
    pub fn init_wait(&self) -> Option<Duration> {
        if self.init_timeout == Duration::ZERO {
            None
        } else {
            Some(self.init_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the retry policy of a durable domain.
    ///
    /// Domains without durable items (`Init`, `TokenUpdate`) get the
    /// subscription policy; they never consult it.
    pub fn retry_policy(&self, domain: Domain) -> RetryPolicy {
        match domain {
            Domain::PushEvent => self.push_event_retry,
            Domain::MobileEvent => self.mobile_event_retry,
            Domain::Init | Domain::Subscription | Domain::TokenUpdate => self.subscription_retry,
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `init_timeout = 7s`
    /// - `token_poll_attempts = 3`, `token_poll_interval = 1s`
    /// - `periodic_interval = 15min`
    /// - `one_shot_backoff`: exponential 30s → 10min, equal jitter
    /// - subscriptions: floor 0, ceiling 5; events: floor 1, ceiling 5
    /// - `event_queue_threshold = 10_000`, `event_queue_trim_to = 5_000`
    /// - `background_settle = 2s`
    /// - `service_retry_threshold = 3`, `service_stop_delay = 1s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(7),
            token_poll_attempts: 3,
            token_poll_interval: Duration::from_secs(1),
            periodic_interval: Duration::from_secs(15 * 60),
            one_shot_backoff: BackoffPolicy {
                first: Duration::from_secs(30),
                max: Duration::from_secs(600),
                factor: 2.0,
                jitter: JitterPolicy::Equal,
            },
            subscription_retry: RetryPolicy::new(0, 5),
            push_event_retry: RetryPolicy::new(1, 5),
            mobile_event_retry: RetryPolicy::new(1, 5),
            event_queue_threshold: 10_000,
            event_queue_trim_to: 5_000,
            background_settle: Duration::from_secs(2),
            service_retry_threshold: 3,
            service_stop_delay: Duration::from_secs(1),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_init_timeout_means_unbounded() {
        let cfg = Config {
            init_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.init_wait(), None);
        assert_eq!(Config::default().init_wait(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn retry_policy_is_per_domain() {
        let cfg = Config::default();
        assert_eq!(cfg.retry_policy(Domain::Subscription).initial_retry, 0);
        assert_eq!(cfg.retry_policy(Domain::MobileEvent).initial_retry, 1);
    }
}
