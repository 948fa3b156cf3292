//! Run state machine, step executor, and orchestrator (§4.1, §4.2, §4.7) —
//! the part of the system that actually drives a workflow run end to end.

pub mod executor;
pub mod orchestrator;
pub mod state_machine;

pub use executor::StepExecutor;
pub use orchestrator::Orchestrator;
pub use state_machine::{RunEvent, RunState, RunStateMachine};
