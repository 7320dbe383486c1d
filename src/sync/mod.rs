//! Coordination primitives of the runtime.
//!
//! - [`SuspendLazy`] memoized async value, cleared on failure or cancellation
//! - [`InitBarrier`] / [`InitGate`] single-flight "initialization is ready" gate
//! - [`CommandQueue`] / [`CommandQueues`] ordered single-consumer command loops
//! - [`ForegroundGate`] deduplicated "run once the app is foreground"
//!
//! ## Wiring
//! ```text
//! Sdk::subscribe(..) ──► CommandQueues[Subscription].submit(cmd)
//!                                  │ (one worker, FIFO)
//!                                  ▼
//!                InitBarrier::await_init(gate, init_timeout)
//!                                  ▼
//!                  DurableDomain::submit (under DomainLocks)
//!
//! Sdk::initialize(..) ─► InitBarrier::reserve() ─► write config ─► complete(gate)
//!                                                    └─► ForegroundGate::on_foreground(
//!                                                          RetryOrchestrator pass)
//! ```

mod barrier;
mod foreground;
mod lazy;
mod queue;

pub use barrier::{GateState, InitBarrier, InitGate};
pub use foreground::ForegroundGate;
pub use lazy::SuspendLazy;
pub use queue::{Command, CommandQueue, CommandQueues, QueueKind};
