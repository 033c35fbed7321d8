use mlbchat_model::{
    ContentBlock, ModelRequest, ResultFragment, Role, ToolDescriptor, Turn,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AnthropicConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {},
    ContentBlockStart {
        index: usize,
        content_block: StartedBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDelta,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StartedBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MessageDelta {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    stream: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Message {
    role: Role,
    content: Vec<Content>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Content {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Vec<Content>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Tool {
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    input_schema: Value,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &AnthropicConfig,
) -> MessagesRequest {
    MessagesRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: req.system.clone(),
        messages: create_messages(&req.turns),
        tools: req.tools.iter().map(create_tool).collect(),
        stream: true,
    }
}

/// Converts turns to messages. Consecutive turns of the same role are
/// merged, the API requires roles to alternate.
fn create_messages(turns: &[Turn]) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::with_capacity(turns.len());
    for turn in turns {
        let content = turn.content.iter().map(create_content);
        match messages.last_mut() {
            Some(last) if last.role == turn.role => {
                last.content.extend(content);
            }
            _ => messages.push(Message {
                role: turn.role,
                content: content.collect(),
            }),
        }
    }
    messages
}

fn create_content(block: &ContentBlock) -> Content {
    match block {
        ContentBlock::Text { text } => Content::Text { text: text.clone() },
        ContentBlock::ToolUse { id, name, input } => Content::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        },
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => Content::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: content.iter().map(create_result_content).collect(),
            is_error: *is_error,
        },
    }
}

/// Text and base64 images map onto native blocks. Any other fragment is
/// forwarded as its JSON text so the model still gets to see it.
fn create_result_content(fragment: &ResultFragment) -> Content {
    if let Some(text) = fragment.as_text() {
        return Content::Text {
            text: text.to_owned(),
        };
    }
    if fragment.kind == "image" {
        let data = fragment.payload.get("data").and_then(Value::as_str);
        let media_type =
            fragment.payload.get("mimeType").and_then(Value::as_str);
        if let (Some(data), Some(media_type)) = (data, media_type) {
            return Content::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: media_type.to_owned(),
                    data: data.to_owned(),
                },
            };
        }
    }
    Content::Text {
        text: serde_json::to_string(fragment).unwrap_or_default(),
    }
}

#[inline]
fn create_tool(tool: &ToolDescriptor) -> Tool {
    Tool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.input_schema.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::AnthropicConfigBuilder;

    fn config() -> AnthropicConfig {
        AnthropicConfigBuilder::with_api_key("xxx")
            .with_model("claude-test")
            .build()
    }

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            system: "You are the General Manager of the Mets.".to_owned(),
            turns: vec![
                Turn::user_text("Evaluate the roster."),
                Turn::assistant(vec![
                    ContentBlock::Text {
                        text: "Let me look.".to_owned(),
                    },
                    ContentBlock::ToolUse {
                        id: "toolu_1".to_owned(),
                        name: "get_team_roster".to_owned(),
                        input: json!({ "team_id": 121 }),
                    },
                    ContentBlock::ToolUse {
                        id: "toolu_2".to_owned(),
                        name: "get_standings".to_owned(),
                        input: json!({}),
                    },
                ]),
                Turn {
                    role: Role::User,
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: "toolu_1".to_owned(),
                        content: vec![ResultFragment::text("Alonso, 1B")],
                        is_error: false,
                    }],
                },
                Turn {
                    role: Role::User,
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: "toolu_2".to_owned(),
                        content: vec![ResultFragment::text("Error: timeout")],
                        is_error: true,
                    }],
                },
            ],
            tools: vec![ToolDescriptor {
                name: "get_team_roster".to_owned(),
                description: String::new(),
                input_schema: json!({ "type": "object" }),
            }],
        };

        let body = serde_json::to_value(create_request(&request, &config()))
            .unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-test",
                "max_tokens": 1000,
                "temperature": 0.15f32,
                "system": "You are the General Manager of the Mets.",
                "messages": [
                    {
                        "role": "user",
                        "content": [
                            { "type": "text", "text": "Evaluate the roster." }
                        ]
                    },
                    {
                        "role": "assistant",
                        "content": [
                            { "type": "text", "text": "Let me look." },
                            {
                                "type": "tool_use",
                                "id": "toolu_1",
                                "name": "get_team_roster",
                                "input": { "team_id": 121 }
                            },
                            {
                                "type": "tool_use",
                                "id": "toolu_2",
                                "name": "get_standings",
                                "input": {}
                            }
                        ]
                    },
                    {
                        "role": "user",
                        "content": [
                            {
                                "type": "tool_result",
                                "tool_use_id": "toolu_1",
                                "content": [
                                    { "type": "text", "text": "Alonso, 1B" }
                                ]
                            },
                            {
                                "type": "tool_result",
                                "tool_use_id": "toolu_2",
                                "content": [
                                    { "type": "text", "text": "Error: timeout" }
                                ],
                                "is_error": true
                            }
                        ]
                    }
                ],
                "tools": [
                    {
                        "name": "get_team_roster",
                        "input_schema": { "type": "object" }
                    }
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn test_empty_system_and_tools_are_omitted() {
        let request = ModelRequest {
            system: String::new(),
            turns: vec![Turn::user_text("Hi")],
            tools: vec![],
        };
        let body = serde_json::to_value(create_request(&request, &config()))
            .unwrap();
        assert!(body.get("system").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_result_fragments() {
        let image: ResultFragment = serde_json::from_value(json!({
            "type": "image",
            "data": "aGk=",
            "mimeType": "image/png"
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(create_result_content(&image)).unwrap(),
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": "image/png",
                    "data": "aGk="
                }
            })
        );

        let resource: ResultFragment = serde_json::from_value(json!({
            "type": "resource",
            "resource": { "uri": "mlb://teams/121" }
        }))
        .unwrap();
        let Content::Text { text } = create_result_content(&resource) else {
            panic!("expected a text block");
        };
        let text: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(text["resource"]["uri"], "mlb://teams/121");
    }

    #[test]
    fn test_parse_stream_events() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_1","name":"get_standings","input":{}}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::ContentBlockStart {
                index: 1,
                content_block: StartedBlock::ToolUse {
                    id: "toolu_1".to_owned(),
                    name: "get_standings".to_owned(),
                    input: json!({}),
                },
            }
        );

        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            StreamEvent::Error { error } if error.kind == "overloaded_error"
        ));

        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"something_new"}"#).unwrap();
        assert_eq!(event, StreamEvent::Unknown);
    }
}
