//! JSON-RPC envelopes and the MCP payloads used by this client.

use mlbchat_model::{ResultFragment, ToolDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
}

impl<'a> Notification<'a> {
    pub fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
        }
    }
}

/// Any message the server may send. Requests and notifications from the
/// server carry a `method`; responses carry `result` or `error`.
#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl Message {
    /// Returns whether this message is the response to request `id`.
    pub fn answers(&self, id: u64) -> bool {
        if self.method.is_some() {
            return false;
        }
        match &self.id {
            Some(Value::Number(n)) => n.as_u64() == Some(id),
            Some(Value::String(s)) => s.parse::<u64>().ok() == Some(id),
            _ => false,
        }
    }

    pub fn into_outcome(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams<'a> {
    pub protocol_version: &'static str,
    pub capabilities: Map<String, Value>,
    pub client_info: ClientInfo<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClientInfo<'a> {
    pub name: &'a str,
    pub version: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ListToolsParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object" })
}

impl From<Tool> for ToolDescriptor {
    fn from(tool: Tool) -> Self {
        ToolDescriptor {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            input_schema: tool.input_schema,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CallToolParams<'a> {
    pub name: &'a str,
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ResultFragment>,
    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_shape() {
        let req = Request::new(3, "tools/list", None);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" })
        );

        let notification = Notification::new("notifications/initialized");
        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "notifications/initialized"
            })
        );
    }

    #[test]
    fn test_message_answers() {
        let msg: Message =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 2 }))
                .unwrap();
        assert!(msg.answers(2));
        assert!(!msg.answers(1));

        let msg: Message =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": "2" }))
                .unwrap();
        assert!(msg.answers(2));

        // A server-initiated request that happens to share the id.
        let msg: Message = serde_json::from_value(
            json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" }),
        )
        .unwrap();
        assert!(!msg.answers(2));
    }

    #[test]
    fn test_tool_listing() {
        let result: ListToolsResult = serde_json::from_value(json!({
            "tools": [
                {
                    "name": "get_team_roster",
                    "description": "Returns the active roster of a team",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "team_id": { "type": "integer" } },
                        "required": ["team_id"]
                    }
                },
                { "name": "get_standings" }
            ],
            "nextCursor": "page-2"
        }))
        .unwrap();
        assert_eq!(result.next_cursor.as_deref(), Some("page-2"));

        let descriptors: Vec<ToolDescriptor> =
            result.tools.into_iter().map(Into::into).collect();
        assert_eq!(descriptors[0].name, "get_team_roster");
        assert_eq!(descriptors[0].input_schema["required"], json!(["team_id"]));
        assert_eq!(descriptors[1].description, "");
        assert_eq!(descriptors[1].input_schema, json!({ "type": "object" }));
    }

    #[test]
    fn test_call_result() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "Mets 72-60" },
                { "type": "image", "data": "aGk=", "mimeType": "image/png" }
            ]
        }))
        .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content[0].as_text(), Some("Mets 72-60"));
        assert_eq!(result.content[1].kind, "image");
        assert_eq!(result.content[1].payload["mimeType"], json!("image/png"));

        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "no such team" }],
            "isError": true
        }))
        .unwrap();
        assert!(result.is_error);
    }
}
