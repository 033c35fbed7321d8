//! Tool discovery and invocation.

mod error;
mod executor;

use async_trait::async_trait;
use mlbchat_model::{ResultFragment, ToolDescriptor};
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;

/// Where the tools of a run come from.
///
/// Each call is independently fallible: a failed invocation says nothing
/// about the next one.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Lists the tools available for a run.
    async fn fetch_catalog(&self) -> Result<Vec<ToolDescriptor>, Error>;

    /// Invokes the tool `name` and returns its result fragments in the
    /// order the tool produced them.
    async fn invoke(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<ResultFragment>, Error>;
}

/// A tool source without any tool, for plain conversations.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTools;

#[async_trait]
impl ToolSource for NoTools {
    async fn fetch_catalog(&self) -> Result<Vec<ToolDescriptor>, Error> {
        Ok(vec![])
    }

    async fn invoke(
        &self,
        name: &str,
        _arguments: Value,
    ) -> Result<Vec<ResultFragment>, Error> {
        Err(Error::unknown_tool().with_reason(format!("no tool named {name}")))
    }
}
