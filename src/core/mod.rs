//! Runtime core: wiring, public façade and the retry pass.
//!
//! - [`builder`]: assembles collaborators into an [`Sdk`];
//! - [`sdk`]: public operations, event listener and job dispatch;
//! - [`orchestrator`]: once-per-process background retry pass.

mod builder;
mod orchestrator;
mod sdk;

pub use builder::SdkBuilder;
pub use orchestrator::RetryOrchestrator;
pub use sdk::Sdk;
