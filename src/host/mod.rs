//! Collaborator interfaces consumed by the runtime.
//!
//! The runtime never talks to a database, network stack, OS lifecycle or job
//! scheduler directly; it goes through these narrow traits:
//!
//! | Trait                    | Role                                              | Reference impl      |
//! |--------------------------|---------------------------------------------------|---------------------|
//! | [`DurableStore`]         | work-item tables + single configuration row       | [`MemoryStore`]     |
//! | [`TransportClient`]      | `send(request) -> Success / Retryable / Fatal`    | –                   |
//! | [`LifecycleSignal`]      | foreground state + "became foreground" watch      | [`HostLifecycle`]   |
//! | [`ScheduledJobRunner`]   | periodic / one-shot jobs, cancel by tag, state    | `LocalJobRunner`    |
//! | [`ServiceHost`]          | stop a hosting foreground service                 | –                   |

mod lifecycle;
mod memory;
mod scheduler;
mod service;
mod store;
mod transport;

pub use lifecycle::{HostLifecycle, LifecycleSignal};
pub use memory::{MemoryStore, StoreOp};
pub use scheduler::{JobState, ScheduledJobRunner};
pub use service::ServiceHost;
pub use store::DurableStore;
pub use transport::{OutboundRequest, RequestKind, SendOutcome, TransportClient};
