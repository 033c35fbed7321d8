mod http;
mod sse;

use mime::Mime;
use mlbchat_sse::Sse;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use serde_json::Value;

use self::http::HttpTransport;
use self::sse::SseTransport;
use crate::config::{McpConfig, TransportKind};
use crate::error::Error;
use crate::proto::{Message, Notification, Request, RpcError};

/// The outcome of one JSON-RPC request as reported by the server.
pub(crate) type RpcOutcome = Result<Value, RpcError>;

/// A connected transport, ready to exchange JSON-RPC messages.
pub(crate) enum Transport {
    Sse(SseTransport),
    Http(HttpTransport),
}

impl Transport {
    pub async fn connect(
        client: &Client,
        config: &McpConfig,
    ) -> Result<Self, Error> {
        let url = Url::parse(&config.url).map_err(|err| {
            Error::transport(format!("invalid endpoint {:?}: {err}", config.url))
        })?;
        match config.transport {
            TransportKind::Sse => SseTransport::connect(client.clone(), url)
                .await
                .map(Transport::Sse),
            TransportKind::StreamableHttp => {
                Ok(Transport::Http(HttpTransport::new(client.clone(), url)))
            }
        }
    }

    pub async fn request(
        &mut self,
        req: &Request<'_>,
    ) -> Result<RpcOutcome, Error> {
        trace!(id = req.id, method = req.method, "sending request");
        match self {
            Transport::Sse(transport) => transport.request(req).await,
            Transport::Http(transport) => transport.request(req).await,
        }
    }

    pub async fn notify(
        &mut self,
        notification: &Notification<'_>,
    ) -> Result<(), Error> {
        match self {
            Transport::Sse(transport) => transport.notify(notification).await,
            Transport::Http(transport) => transport.notify(notification).await,
        }
    }

    pub async fn close(self) {
        match self {
            // Dropping the event stream ends the session.
            Transport::Sse(_) => {}
            Transport::Http(transport) => transport.close().await,
        }
    }
}

fn check_status(response: &Response, what: &str) -> Result<(), Error> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::transport(format!("{what} answered {status}")));
    }
    Ok(())
}

fn content_type(response: &Response) -> Option<Mime> {
    response
        .headers()
        .get(CONTENT_TYPE)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Picks the response to request `id` out of a decoded message or batch.
///
/// Returns `None` if nothing in `payload` answers the request.
pub(crate) fn find_response(
    payload: Value,
    id: u64,
) -> Result<Option<RpcOutcome>, Error> {
    let messages = match payload {
        Value::Array(batch) => batch,
        single => vec![single],
    };
    for message in messages {
        let message: Message = serde_json::from_value(message).map_err(
            |err| Error::protocol(format!("invalid JSON-RPC message: {err}")),
        )?;
        if message.answers(id) {
            return Ok(Some(message.into_outcome()));
        }
        trace!(method = ?message.method, "skipping unrelated message");
    }
    Ok(None)
}

/// Reads events until the response to request `id` shows up.
///
/// Events other than `message`, server notifications and responses to
/// other requests are skipped.
pub(crate) async fn read_response(
    events: &mut Sse,
    id: u64,
) -> Result<RpcOutcome, Error> {
    loop {
        let event = events.next_event().await.map_err(|err| {
            Error::transport(format!("event stream failed: {err}"))
        })?;
        let Some(event) = event else {
            return Err(Error::transport(
                "event stream closed before the response arrived",
            ));
        };
        if event.name() != "message" {
            trace!(event = event.name(), "skipping event");
            continue;
        }

        let payload: Value = serde_json::from_str(&event.data).map_err(
            |err| Error::protocol(format!("invalid JSON-RPC message: {err}")),
        )?;
        if let Some(outcome) = find_response(payload, id)? {
            return Ok(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use mlbchat_sse::Chunks;
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    fn events_from(chunks: &[&'static str]) -> Sse {
        Sse::new(Chunks::from_vec_deque(
            chunks
                .iter()
                .map(|c| Bytes::from_static(c.as_bytes()))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_read_response_skips_unrelated() {
        let mut events = events_from(&[
            ": ping\n\n",
            "event: endpoint\ndata: /messages\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\"}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n",
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[]}}\n\n",
        ]);
        let outcome = read_response(&mut events, 2).await.unwrap();
        assert_eq!(outcome, Ok(json!({ "tools": [] })));
    }

    #[tokio::test]
    async fn test_read_response_rpc_error() {
        let mut events = events_from(&[
            "data: {\"jsonrpc\":\"2.0\",\"id\":\"4\",\"error\":",
            "{\"code\":-32602,\"message\":\"unknown tool\"}}\n\n",
        ]);
        let outcome = read_response(&mut events, 4).await.unwrap();
        let err = outcome.unwrap_err();
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "unknown tool");
    }

    #[tokio::test]
    async fn test_read_response_failures() {
        let mut events = events_from(&[
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n",
        ]);
        let err = read_response(&mut events, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let mut events = events_from(&["data: not json\n\n"]);
        let err = read_response(&mut events, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_find_response_in_batch() {
        let batch = json!([
            { "jsonrpc": "2.0", "method": "notifications/progress" },
            { "jsonrpc": "2.0", "id": 7, "result": { "content": [] } }
        ]);
        let outcome = find_response(batch, 7).unwrap().unwrap();
        assert_eq!(outcome, Ok(json!({ "content": [] })));

        let single = json!({ "jsonrpc": "2.0", "id": 6, "result": {} });
        assert!(find_response(single, 7).unwrap().is_none());
    }
}
