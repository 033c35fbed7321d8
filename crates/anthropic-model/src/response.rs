use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use mlbchat_model::{
    ErrorKind, FinishReason, ModelResponse, ModelResponseEvent, ToolUseRequest,
};
use mlbchat_sse::Sse;
use pin_project_lite::pin_project;
use serde_json::{Map, Value};

use crate::Error;
use crate::proto::{BlockDelta, StartedBlock, StreamEvent};

struct PartialToolUse {
    id: String,
    name: String,
    input: Value,
    // Fragments of the input object, it is only parsable as a whole.
    partial_json: String,
}

impl PartialToolUse {
    fn finish(self) -> Result<ToolUseRequest, Error> {
        let input = if self.partial_json.is_empty() {
            match self.input {
                Value::Null => Value::Object(Map::new()),
                input => input,
            }
        } else {
            serde_json::from_str(&self.partial_json).map_err(|err| {
                Error::new(
                    format!("invalid input for tool {}: {err}", self.name),
                    ErrorKind::MalformedResponse,
                )
            })?
        };
        Ok(ToolUseRequest {
            id: self.id,
            name: self.name,
            input,
        })
    }
}

struct PartialState {
    sse: Sse,
    tool_uses: HashMap<usize, PartialToolUse>,
    stop_reason: Option<FinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct AnthropicResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl AnthropicResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            tool_uses: Default::default(),
            stop_reason: None,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for AnthropicResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        if matches!(event, ModelResponseEvent::Completed(_)) {
            // Nothing meaningful follows `message_stop`.
            *this.next_event_fut = None;
        } else {
            let next_event_fut = async move { next_event(partial_state).await };
            *this.next_event_fut = Some(Box::pin(next_event_fut));
        }

        Poll::Ready(Ok(Some(event)))
    }
}

fn finish_reason(stop_reason: &str) -> FinishReason {
    match stop_reason {
        "end_turn" | "stop_sequence" => FinishReason::EndTurn,
        "tool_use" => FinishReason::ToolUse,
        "max_tokens" => FinishReason::MaxTokens,
        _ => FinishReason::Other,
    }
}

fn error_kind(error_type: &str) -> ErrorKind {
    match error_type {
        "overloaded_error" => ErrorKind::Overloaded,
        "rate_limit_error" => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                return Err(Error::new(
                    "stream ended before message_stop",
                    ErrorKind::MalformedResponse,
                ));
            }
            Err(err) => return Err(Error::new(format!("{err}"), ErrorKind::Other)),
        };
        trace!("got sse event: {}", sse_event.data);

        let stream_event = serde_json::from_str::<StreamEvent>(&sse_event.data)
            .map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::MalformedResponse)
            })?;

        let event = match stream_event {
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                StartedBlock::Text { text } if !text.is_empty() => {
                    ModelResponseEvent::TextDelta(text)
                }
                StartedBlock::ToolUse { id, name, input } => {
                    partial_state.tool_uses.insert(
                        index,
                        PartialToolUse {
                            id,
                            name,
                            input,
                            partial_json: String::new(),
                        },
                    );
                    continue;
                }
                _ => continue,
            },
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } if !text.is_empty() => {
                    ModelResponseEvent::TextDelta(text)
                }
                BlockDelta::InputJsonDelta { partial_json } => {
                    let Some(tool_use) = partial_state.tool_uses.get_mut(&index)
                    else {
                        return Err(Error::new(
                            format!("input delta for unknown block {index}"),
                            ErrorKind::MalformedResponse,
                        ));
                    };
                    tool_use.partial_json.push_str(&partial_json);
                    continue;
                }
                _ => continue,
            },
            StreamEvent::ContentBlockStop { index } => {
                let Some(tool_use) = partial_state.tool_uses.remove(&index)
                else {
                    continue;
                };
                ModelResponseEvent::ToolUse(tool_use.finish()?)
            }
            StreamEvent::MessageDelta { delta } => {
                if let Some(stop_reason) = delta.stop_reason {
                    partial_state.stop_reason =
                        Some(finish_reason(&stop_reason));
                }
                continue;
            }
            StreamEvent::MessageStop => {
                let reason =
                    partial_state.stop_reason.unwrap_or(FinishReason::EndTurn);
                ModelResponseEvent::Completed(reason)
            }
            StreamEvent::Error { error } => {
                return Err(Error::new(error.message, error_kind(&error.kind)));
            }
            StreamEvent::MessageStart {}
            | StreamEvent::Ping
            | StreamEvent::Unknown => continue,
        };
        return Ok((Some(event), partial_state));
    }
}
