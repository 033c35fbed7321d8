//! The shared vocabulary between the orchestrator and the chat endpoints.
//!
//! This crate establishes the conversation data model (turns, content
//! blocks, tool descriptors) and the protocol a chat completion endpoint
//! has to follow, so that the orchestrator can drive any supported model
//! without knowing its wire format.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;
mod transcript;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
pub use transcript::*;
