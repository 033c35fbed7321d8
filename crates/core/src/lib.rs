//! Core logic of a tool-augmented conversation: the orchestration loop,
//! the transcript it accumulates, and the seams it talks through.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod cancel;
pub mod conversation;
mod error;
pub mod followup;
mod model_client;
pub mod observer;
mod orchestrator;
pub mod tool;

pub use cancel::{CancelSignal, Canceller, cancellation};
pub use error::RunError;
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, RunOutcome, Stage, StopReason,
};
