use mlbchat_model::{ResultFragment, ToolDescriptor};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{McpConfig, TransportKind};
use crate::error::Error;
use crate::proto::{
    CallToolParams, CallToolResult, ClientInfo, InitializeParams,
    ListToolsParams, ListToolsResult, Notification, Request,
};
use crate::transport::{RpcOutcome, Transport};

/// An initialized MCP session.
pub(crate) struct Session {
    transport: Transport,
    next_id: u64,
}

impl Session {
    /// Connects the transport. The session still has to be initialized.
    pub async fn connect(
        client: &Client,
        config: &McpConfig,
    ) -> Result<Self, Error> {
        let transport = Transport::connect(client, config).await?;
        Ok(Session {
            transport,
            next_id: 1,
        })
    }

    /// Performs the initialization handshake.
    pub async fn initialize(&mut self, config: &McpConfig) -> Result<(), Error> {
        let params = InitializeParams {
            protocol_version: match config.transport {
                TransportKind::Sse => "2024-11-05",
                TransportKind::StreamableHttp => "2025-03-26",
            },
            capabilities: Map::new(),
            client_info: ClientInfo {
                name: &config.client_name,
                version: &config.client_version,
            },
        };
        let result = self
            .call("initialize", params)
            .await?
            .map_err(|err| {
                Error::transport(format!(
                    "initialization rejected: {} ({})",
                    err.message, err.code
                ))
            })?;
        debug!(server = ?result.get("serverInfo"), "session initialized");

        self.transport
            .notify(&Notification::new("notifications/initialized"))
            .await
    }

    async fn call<P: Serialize>(
        &mut self,
        method: &str,
        params: P,
    ) -> Result<RpcOutcome, Error> {
        let params = serde_json::to_value(params).map_err(|err| {
            Error::protocol(format!("failed to encode {method}: {err}"))
        })?;
        let id = self.next_id;
        self.next_id += 1;
        self.transport
            .request(&Request::new(id, method, Some(params)))
            .await
    }

    /// Lists every tool the server offers, following pagination.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, Error> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = ListToolsParams {
                cursor: cursor.as_deref(),
            };
            let result = self.call("tools/list", params).await?.map_err(|err| {
                Error::protocol(format!(
                    "tools/list failed: {} ({})",
                    err.message, err.code
                ))
            })?;
            let page: ListToolsResult =
                serde_json::from_value(result).map_err(|err| {
                    Error::protocol(format!("invalid tool listing: {err}"))
                })?;
            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));

            match page.next_cursor {
                Some(next)
                    if !next.is_empty() && cursor.as_ref() != Some(&next) =>
                {
                    cursor = Some(next);
                }
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Calls a tool. A result flagged as an error is returned as
    /// [`ErrorKind::ToolExecution`](crate::ErrorKind::ToolExecution).
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<ResultFragment>, Error> {
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            arguments => arguments,
        };
        let result = self
            .call("tools/call", CallToolParams { name, arguments })
            .await?
            .map_err(|err| Error::tool_execution(err.message))?;
        let result: CallToolResult =
            serde_json::from_value(result).map_err(|err| {
                Error::protocol(format!("invalid tool result: {err}"))
            })?;

        if result.is_error {
            let message = result
                .content
                .iter()
                .filter_map(ResultFragment::as_text)
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::tool_execution(if message.is_empty() {
                format!("{name} reported a failure")
            } else {
                message
            }));
        }
        Ok(result.content)
    }

    pub async fn close(self) {
        self.transport.close().await;
    }
}
