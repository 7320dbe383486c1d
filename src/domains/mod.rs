//! Domain operations.
//!
//! - [`Domain`] the five logical domains and their queue/kind mapping
//! - [`DomainLocks`] one async mutex per domain
//! - [`DurableDomain`] persist-then-attempt commands and retry sweeps for
//!   subscriptions, push events and mobile events
//! - [`TokenSync`] the token-update check
//! - [`Domains`] all of the above, addressable by [`Domain`]

mod domain;
mod durable;
mod locks;
mod token_sync;

pub use domain::Domain;
pub use durable::{Attempt, DurableDomain, TrimPolicy};
pub use locks::DomainLocks;
pub use token_sync::TokenSync;

/// Every domain operation of one runtime.
pub struct Domains {
    pub subscription: DurableDomain,
    pub push_event: DurableDomain,
    pub mobile_event: DurableDomain,
    pub token: TokenSync,
}

impl Domains {
    /// Durable domain backing `domain`, if it has one.
    pub fn durable(&self, domain: Domain) -> Option<&DurableDomain> {
        match domain {
            Domain::Subscription => Some(&self.subscription),
            Domain::PushEvent => Some(&self.push_event),
            Domain::MobileEvent => Some(&self.mobile_event),
            Domain::Init | Domain::TokenUpdate => None,
        }
    }

    /// Runs `domain`'s sweep. Returns `true` if work remains.
    pub async fn sweep(&self, domain: Domain) -> bool {
        match domain {
            Domain::TokenUpdate => self.token.check_and_update().await,
            Domain::Init => false,
            other => match self.durable(other) {
                Some(d) => d.retry_sweep().await,
                None => false,
            },
        }
    }
}
