//! # Backoff curve for one-shot retry jobs.
//!
//! [`BackoffPolicy`] is handed to the [`ScheduledJobRunner`](crate::host::ScheduledJobRunner)
//! together with every one-shot job. When a job reports
//! [`WorkResult::Retry`](crate::workers::WorkResult), the runner waits
//! `backoff.next(attempt)` before running it again.
//!
//! The delay for attempt `n` is `first × factor^n`, clamped to `max`, then
//! jitter is applied. The base is derived from the attempt number only, so
//! jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use pushvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(30),
//!     max: Duration::from_secs(600),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(30));
//! assert_eq!(backoff.next(2), Duration::from_secs(120));
//! assert_eq!(backoff.next(10), Duration::from_secs(600));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Backoff policy of one-shot retry jobs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first re-run.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied on top of the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a constant 30s delay without jitter (10min cap).
    fn default() -> Self {
        Self {
            first: Duration::from_secs(30),
            max: Duration::from_secs(600),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay before re-running after the given attempt (0-indexed).
    ///
    /// Non-finite or negative intermediate values clamp to [`BackoffPolicy::max`].
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let raw = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !raw.is_finite() || raw < 0.0 || raw > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(raw)
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn one_shot(jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            jitter,
            ..Config::default().one_shot_backoff
        }
    }

    #[test]
    fn one_shot_curve_doubles_up_to_ten_minutes() {
        let policy = one_shot(JitterPolicy::None);
        let secs: Vec<u64> = (0..7).map(|n| policy.next(n).as_secs()).collect();
        assert_eq!(secs, vec![30, 60, 120, 240, 480, 600, 600]);
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(600));
    }

    #[test]
    fn default_is_constant() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.next(0), policy.next(9));
    }

    #[test]
    fn first_delay_is_capped_by_max() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(900),
            ..one_shot(JitterPolicy::None)
        };
        assert_eq!(policy.next(0), Duration::from_secs(600));
    }

    #[test]
    fn default_config_jitter_keeps_upper_half() {
        let policy = Config::default().one_shot_backoff;
        for attempt in 0..8 {
            let base = one_shot(JitterPolicy::None).next(attempt);
            let delay = policy.next(attempt);
            assert!(delay >= base / 2 && delay <= base, "attempt {attempt}: {delay:?}");
        }
    }

    #[test]
    fn decorrelated_never_drops_below_first() {
        let policy = one_shot(JitterPolicy::Decorrelated);
        for _ in 0..50 {
            assert!(policy.next(4) >= Duration::from_secs(30));
        }
    }
}
