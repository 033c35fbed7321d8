//! Trade analysis chats between an MLB general manager played by Claude and
//! a baseball statistics MCP server.
//!
//! The crate includes a CLI tool for running the analyses in the terminal.
//! You can also use it as a library to run them from your own programs.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod prompts;
mod tools;
pub mod trades;

pub use tools::McpToolSource;
pub use trades::Analyst;

/// Re-exports of [`mlbchat_core`] crate.
pub mod core {
    pub use mlbchat_core::*;
}
