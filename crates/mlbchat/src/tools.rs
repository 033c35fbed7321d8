use async_trait::async_trait;
use mlbchat_core::tool::{self, ToolSource};
use mlbchat_mcp::{ErrorKind as McpErrorKind, McpConfig, McpEndpoint};
use mlbchat_model::{ResultFragment, ToolDescriptor};
use serde_json::Value;

/// A [`ToolSource`] backed by an MCP server.
#[derive(Clone, Debug)]
pub struct McpToolSource {
    endpoint: McpEndpoint,
}

impl McpToolSource {
    /// Creates a tool source for the server described by `config`.
    #[inline]
    pub fn new(config: McpConfig) -> Self {
        Self::with_endpoint(McpEndpoint::new(config))
    }

    /// Creates a tool source over an existing endpoint.
    #[inline]
    pub fn with_endpoint(endpoint: McpEndpoint) -> Self {
        Self { endpoint }
    }
}

fn to_tool_error(err: mlbchat_mcp::Error) -> tool::Error {
    let error = match err.kind() {
        McpErrorKind::Transport | McpErrorKind::Protocol => {
            tool::Error::transport()
        }
        McpErrorKind::ToolExecution => tool::Error::execution(),
    };
    error.with_reason(err.message())
}

#[async_trait]
impl ToolSource for McpToolSource {
    async fn fetch_catalog(&self) -> Result<Vec<ToolDescriptor>, tool::Error> {
        self.endpoint.fetch_catalog().await.map_err(to_tool_error)
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<ResultFragment>, tool::Error> {
        self.endpoint
            .invoke(name, arguments)
            .await
            .map_err(to_tool_error)
    }
}
