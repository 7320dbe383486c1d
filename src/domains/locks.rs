use tokio::sync::{Mutex, MutexGuard};

use crate::domains::Domain;

/// One async mutex per [`Domain`].
///
/// Guards the persist-and-dispatch critical section so that a retry sweep and
/// a fresh command of the same domain never interleave. Independent of queue
/// ordering: sweeps run outside the command queues.
#[derive(Default)]
pub struct DomainLocks {
    locks: [Mutex<()>; 5],
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and takes `domain`'s lock.
    pub async fn lock(&self, domain: Domain) -> MutexGuard<'_, ()> {
        self.locks[domain as usize].lock().await
    }

    /// Takes `domain`'s lock if it is free.
    pub fn try_lock(&self, domain: Domain) -> Option<MutexGuard<'_, ()>> {
        self.locks[domain as usize].try_lock().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn domains_lock_independently() {
        let locks = DomainLocks::new();
        let _sub = locks.lock(Domain::Subscription).await;

        assert!(locks.try_lock(Domain::Subscription).is_none());
        assert!(locks.try_lock(Domain::MobileEvent).is_some());
    }
}
