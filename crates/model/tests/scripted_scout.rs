//! A provider written against the public surface only, to make sure the
//! protocol is implementable from outside the crate.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll};

use mlbchat_model::{
    ContentBlock, ErrorKind, FinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, ResultFragment, Role,
    ToolDescriptor, ToolUseRequest, Turn,
};
use serde_json::json;

#[derive(Debug)]
struct ScoutError(ErrorKind);

impl Display for ScoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "scout failed: {:?}", self.0)
    }
}

impl Error for ScoutError {}

impl ModelProviderError for ScoutError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct ScoutResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl ModelResponse for ScoutResponse {
    type Error = ScoutError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}

/// Looks up the roster of the team named in the question, then reports
/// how many players it found.
struct Scout;

impl Scout {
    fn respond(req: &ModelRequest) -> Result<ScoutResponse, ScoutError> {
        let last = req.turns.last().ok_or(ScoutError(ErrorKind::Other))?;
        if last.role != Role::User {
            return Err(ScoutError(ErrorKind::MalformedResponse));
        }

        let mut events = VecDeque::new();
        for block in &last.content {
            match block {
                ContentBlock::Text { text } => {
                    if !req.tools.iter().any(|tool| tool.name == "roster") {
                        return Err(ScoutError(ErrorKind::Other));
                    }
                    events.push_back(ModelResponseEvent::TextDelta(
                        "Checking the roster.".to_owned(),
                    ));
                    events.push_back(ModelResponseEvent::ToolUse(
                        ToolUseRequest {
                            id: "toolu_1".to_owned(),
                            name: "roster".to_owned(),
                            input: json!({ "team": text }),
                        },
                    ));
                    events.push_back(ModelResponseEvent::Completed(
                        FinishReason::ToolUse,
                    ));
                }
                ContentBlock::ToolResult { content, .. } => {
                    let players = content
                        .iter()
                        .filter_map(ResultFragment::as_text)
                        .count();
                    events.push_back(ModelResponseEvent::TextDelta(format!(
                        "{players} players on the roster."
                    )));
                    events.push_back(ModelResponseEvent::Completed(
                        FinishReason::EndTurn,
                    ));
                }
                ContentBlock::ToolUse { .. } => {
                    return Err(ScoutError(ErrorKind::MalformedResponse));
                }
            }
        }
        Ok(ScoutResponse { events })
    }
}

impl ModelProvider for Scout {
    type Error = ScoutError;
    type Response = ScoutResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(Self::respond(req))
    }
}

async fn drain(
    mut resp: ScoutResponse,
) -> (Vec<ContentBlock>, Option<FinishReason>) {
    let mut blocks = vec![];
    let mut finish_reason = None;
    while let Some(event) =
        poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        match event {
            ModelResponseEvent::TextDelta(text) => {
                blocks.push(ContentBlock::Text { text });
            }
            ModelResponseEvent::ToolUse(req) => blocks.push(req.into()),
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }
    (blocks, finish_reason)
}

fn roster_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "roster".to_owned(),
        description: "Active roster of a team".to_owned(),
        input_schema: json!({
            "type": "object",
            "properties": { "team": { "type": "string" } },
        }),
    }
}

#[tokio::test]
async fn test_tool_round_trip() {
    let mut req = ModelRequest {
        system: "You are a scout.".to_owned(),
        turns: vec![Turn::user_text("Washington Nationals")],
        tools: vec![roster_tool()],
    };

    let resp = Scout.send_request(&req).await.unwrap();
    let (blocks, finish_reason) = drain(resp).await;
    assert_eq!(finish_reason, Some(FinishReason::ToolUse));
    assert_eq!(
        blocks[1],
        ContentBlock::ToolUse {
            id: "toolu_1".to_owned(),
            name: "roster".to_owned(),
            input: json!({ "team": "Washington Nationals" }),
        }
    );

    req.turns.push(Turn::assistant(blocks));
    req.turns.push(Turn {
        role: Role::User,
        content: vec![ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_owned(),
            content: vec![
                ResultFragment::text("CJ Abrams"),
                ResultFragment::text("James Wood"),
            ],
            is_error: false,
        }],
    });

    let resp = Scout.send_request(&req).await.unwrap();
    let (blocks, finish_reason) = drain(resp).await;
    assert_eq!(finish_reason, Some(FinishReason::EndTurn));
    assert_eq!(blocks[0].as_text(), Some("2 players on the roster."));
}

#[tokio::test]
async fn test_rejected_requests() {
    let empty = ModelRequest {
        system: String::new(),
        turns: vec![],
        tools: vec![roster_tool()],
    };
    let err = Scout.send_request(&empty).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(!err.kind().is_transient());

    let ends_with_assistant = ModelRequest {
        turns: vec![Turn::assistant(vec![])],
        ..empty
    };
    let err = Scout.send_request(&ends_with_assistant).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}
