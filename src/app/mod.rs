mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::CardcamOrchestrator;
pub use runtime::ShutdownTrigger;
pub use types::{ComponentState, ShutdownReason};
