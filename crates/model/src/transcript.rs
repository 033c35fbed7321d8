use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who a turn is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller, including prompts injected by the orchestrator and
    /// tool results.
    User,
    /// The model.
    Assistant,
}

/// One message-equivalent unit of a conversation.
///
/// The content sequence is fixed once the turn is appended to a
/// transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The author of this turn.
    pub role: Role,
    /// The ordered content of this turn.
    pub content: Vec<ContentBlock>,
}

impl Turn {
    /// Creates a user turn with a single text block.
    #[inline]
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Creates an assistant turn with the given blocks.
    #[inline]
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}

/// One unit of content within a turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A request from the model to invoke a tool.
    ToolUse {
        /// The identifier assigned by the model, unique within the
        /// transcript.
        id: String,
        /// Name of the tool to invoke.
        name: String,
        /// The structured argument object.
        input: Value,
    },
    /// The answer to a previous [`ContentBlock::ToolUse`].
    ToolResult {
        /// The identifier of the request this block answers.
        tool_use_id: String,
        /// The ordered result fragments.
        content: Vec<ResultFragment>,
        /// Whether the content describes a failure.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Returns the text if this is a text block.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A tool invocation request as delivered by a model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseRequest {
    /// The unique identifier for the tool invocation request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The argument object to pass to the tool.
    pub input: Value,
}

impl From<ToolUseRequest> for ContentBlock {
    #[inline]
    fn from(req: ToolUseRequest) -> Self {
        ContentBlock::ToolUse {
            id: req.id,
            name: req.name,
            input: req.input,
        }
    }
}

/// A typed piece of a tool result.
///
/// Fragments are kept exactly as the tool provider reported them: the
/// `type` tag plus whatever fields came along with it. This way a result
/// can be passed on to the model without losing its kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFragment {
    /// The content kind, e.g. `text` or `image`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The remaining fields of the fragment.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ResultFragment {
    /// Creates a `text` fragment.
    pub fn text<S: Into<String>>(text: S) -> Self {
        let mut payload = Map::new();
        payload.insert("text".to_owned(), Value::String(text.into()));
        Self {
            kind: "text".to_owned(),
            payload,
        }
    }

    /// Returns the text if this is a `text` fragment.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        if self.kind != "text" {
            return None;
        }
        self.payload.get("text").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_turn_wire_shape() {
        let turn = Turn::assistant(vec![
            ContentBlock::Text {
                text: "Let me check.".to_owned(),
            },
            ContentBlock::ToolUse {
                id: "toolu_1".to_owned(),
                name: "roster".to_owned(),
                input: json!({ "team": "Washington Nationals" }),
            },
        ]);
        assert_eq!(
            serde_json::to_value(&turn).unwrap(),
            json!({
                "role": "assistant",
                "content": [
                    { "type": "text", "text": "Let me check." },
                    {
                        "type": "tool_use",
                        "id": "toolu_1",
                        "name": "roster",
                        "input": { "team": "Washington Nationals" }
                    }
                ]
            })
        );
    }

    #[test]
    fn test_is_error_omitted_when_false() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_owned(),
            content: vec![ResultFragment::text("ok")],
            is_error: false,
        };
        let value = serde_json::to_value(&block).unwrap();
        assert!(value.get("is_error").is_none());

        let parsed: ContentBlock = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_fragment_keeps_unknown_kinds() {
        let raw = json!({
            "type": "image",
            "data": "aGVsbG8=",
            "mimeType": "image/png"
        });
        let fragment: ResultFragment =
            serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(fragment.kind, "image");
        assert_eq!(fragment.as_text(), None);
        assert_eq!(serde_json::to_value(&fragment).unwrap(), raw);

        let text = ResultFragment::text("hello");
        assert_eq!(text.as_text(), Some("hello"));
    }
}
