use std::fmt;

use crate::host::RequestKind;
use crate::store::WorkKind;
use crate::sync::QueueKind;

/// Logical domain of work. Each has its own queue, lock and retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    /// SDK initialization.
    Init,
    /// Device profile subscription.
    Subscription,
    /// Application events.
    MobileEvent,
    /// Push interaction events.
    PushEvent,
    /// Push token synchronization.
    TokenUpdate,
}

impl Domain {
    /// Every domain, in declaration order.
    pub const ALL: [Domain; 5] = [
        Domain::Init,
        Domain::Subscription,
        Domain::MobileEvent,
        Domain::PushEvent,
        Domain::TokenUpdate,
    ];

    /// Domains that own background jobs.
    pub const SCHEDULED: [Domain; 4] = [
        Domain::Subscription,
        Domain::TokenUpdate,
        Domain::PushEvent,
        Domain::MobileEvent,
    ];

    /// Stable snake_case name, also used as event tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Init => "init",
            Domain::Subscription => "subscription",
            Domain::MobileEvent => "mobile_event",
            Domain::PushEvent => "push_event",
            Domain::TokenUpdate => "token_update",
        }
    }

    /// Parses [`as_str`](Self::as_str) output.
    pub fn parse(s: &str) -> Option<Domain> {
        Domain::ALL.into_iter().find(|d| d.as_str() == s)
    }

    /// Command queue this domain's commands are submitted to.
    pub fn queue(&self) -> QueueKind {
        match self {
            Domain::Init => QueueKind::Init,
            Domain::MobileEvent => QueueKind::MobileEvent,
            Domain::Subscription | Domain::PushEvent | Domain::TokenUpdate => {
                QueueKind::Subscription
            }
        }
    }

    /// Durable item kind, for domains that persist work.
    pub fn work_kind(&self) -> Option<WorkKind> {
        match self {
            Domain::Subscription => Some(WorkKind::Subscription),
            Domain::PushEvent => Some(WorkKind::PushEvent),
            Domain::MobileEvent => Some(WorkKind::MobileEvent),
            Domain::Init | Domain::TokenUpdate => None,
        }
    }

    /// Transport request kind, for domains that talk to the server.
    pub fn request_kind(&self) -> Option<RequestKind> {
        match self {
            Domain::Subscription => Some(RequestKind::Subscribe),
            Domain::PushEvent => Some(RequestKind::PushEvent),
            Domain::MobileEvent => Some(RequestKind::MobileEvent),
            Domain::TokenUpdate => Some(RequestKind::TokenUpdate),
            Domain::Init => None,
        }
    }

    /// `true` for work that only runs while the push module is active.
    pub fn is_push(&self) -> bool {
        matches!(
            self,
            Domain::Subscription | Domain::PushEvent | Domain::TokenUpdate
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_queues_match_grouping() {
        for d in Domain::ALL {
            assert_eq!(Domain::parse(d.as_str()), Some(d));
        }
        assert_eq!(Domain::parse("nope"), None);

        assert_eq!(Domain::PushEvent.queue(), QueueKind::Subscription);
        assert_eq!(Domain::TokenUpdate.queue(), QueueKind::Subscription);
        assert_eq!(Domain::MobileEvent.queue(), QueueKind::MobileEvent);
        assert!(!Domain::MobileEvent.is_push());
    }
}
