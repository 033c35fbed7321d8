use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use mlbchat_model::{
    ContentBlock, ErrorKind, FinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Box<dyn Fn(String) + Send + 'static>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// Errors raised by the client itself rather than by the provider.
#[derive(Debug)]
struct ClientError {
    kind: ErrorKind,
    message: String,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ClientError {}

impl ModelProviderError for ClientError {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules, and assembles streamed events into
/// content blocks.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    timeout: Option<Duration>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_text| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_text).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            timeout: None,
        }
    }

    /// Bounds every request, streaming included.
    #[inline]
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Sends a request and returns the fully received response.
    ///
    /// `on_text` receives text deltas as they arrive.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_text: impl Fn(String) + Send + 'static,
    ) -> SendRequestResult {
        let fut = (self.handler_fn)(req, Box::new(on_text));
        let Some(timeout) = self.timeout else {
            return fut.await;
        };
        match tokio::time::timeout(timeout, fut).await {
            Ok(resp_or_err) => resp_or_err,
            Err(_) => Err(Box::new(ClientError {
                kind: ErrorKind::Timeout,
                message: format!("no complete response within {timeout:?}"),
            })),
        }
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelClientResponse {
    /// The content in the order the model produced it. Never empty.
    pub blocks: Vec<ContentBlock>,
    /// The reason the model finished generating.
    pub finish_reason: Option<FinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_text: Box<dyn Fn(String) + Send + 'static>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut blocks = Vec::new();
    let mut text: Option<String> = None;
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::TextDelta(delta) => {
                if delta.is_empty() {
                    continue;
                }
                text.get_or_insert_default().push_str(&delta);
                on_text(delta);
            }
            ModelResponseEvent::ToolUse(req) => {
                // A tool request closes the text block before it.
                if let Some(text) = text.take() {
                    blocks.push(ContentBlock::Text { text });
                }
                blocks.push(req.into());
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }
    if let Some(text) = text.take() {
        blocks.push(ContentBlock::Text { text });
    }

    trace!("finished a request");

    if blocks.is_empty() {
        return Err(Box::new(ClientError {
            kind: ErrorKind::MalformedResponse,
            message: format!(
                "completion has no content (finish reason: {finish_reason:?})"
            ),
        }));
    }
    Ok(ModelClientResponse {
        blocks,
        finish_reason,
    })
}
