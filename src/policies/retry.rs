//! # Retry ceiling policy for durable work items.
//!
//! A [`RetryPolicy`] is stamped onto every [`WorkItem`](crate::store::WorkItem)
//! at creation time: `initial_retry` becomes the item's starting `retry_count`
//! and `max_retries` its `max_retry_count`.
//!
//! An item starting at `r0` with ceiling `m` survives exactly `m - r0 + 1`
//! retryable failures; the next sweep deletes it.

/// Per-domain retry floor and ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry counter value of a freshly created item.
    pub initial_retry: u32,
    /// Highest retry counter value that is still attempted.
    pub max_retries: u32,
    /// Delete an item immediately when the transport reports a fatal error.
    ///
    /// `false` keeps fatal errors on the retryable path, so they consume the
    /// retry budget like any transient failure.
    pub drop_fatal: bool,
}

impl RetryPolicy {
    /// Creates a policy with the given floor and ceiling; fatal errors stay retryable.
    pub const fn new(initial_retry: u32, max_retries: u32) -> Self {
        Self {
            initial_retry,
            max_retries,
            drop_fatal: false,
        }
    }

    /// Returns a policy that deletes items on fatal transport errors.
    pub const fn dropping_fatal(mut self) -> Self {
        self.drop_fatal = true;
        self
    }

    /// Number of retryable failures an item survives before deletion.
    pub fn budget(&self) -> u32 {
        self.max_retries
            .saturating_add(1)
            .saturating_sub(self.initial_retry)
    }
}

impl Default for RetryPolicy {
    /// Floor 0, ceiling 5, fatal errors retried.
    fn default() -> Self {
        Self::new(0, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_counts_inclusive_range() {
        assert_eq!(RetryPolicy::new(0, 3).budget(), 4);
        assert_eq!(RetryPolicy::new(1, 5).budget(), 5);
        assert_eq!(RetryPolicy::new(3, 3).budget(), 1);
        assert_eq!(RetryPolicy::new(4, 2).budget(), 0);
    }

    #[test]
    fn dropping_fatal_flips_flag_only() {
        let p = RetryPolicy::new(1, 5).dropping_fatal();
        assert!(p.drop_fatal);
        assert_eq!(p.max_retries, 5);
    }
}
