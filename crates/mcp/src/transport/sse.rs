use mlbchat_sse::{Chunks, Sse};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};

use super::{RpcOutcome, check_status, content_type, read_response};
use crate::error::Error;
use crate::proto::{Notification, Request};

/// The HTTP+SSE transport.
///
/// A GET request opens the event stream, whose first `endpoint` event
/// names the URL that client messages are posted to. Responses arrive on
/// the event stream.
pub(crate) struct SseTransport {
    client: Client,
    endpoint: Url,
    events: Sse,
}

impl SseTransport {
    pub async fn connect(client: Client, url: Url) -> Result<Self, Error> {
        let response = client
            .get(url.clone())
            .header(ACCEPT, mime::TEXT_EVENT_STREAM.essence_str())
            .send()
            .await
            .map_err(|err| {
                Error::transport(format!("failed to connect to {url}: {err}"))
            })?;
        check_status(&response, "event stream")?;
        let is_event_stream = content_type(&response).is_some_and(|kind| {
            kind.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
        });
        if !is_event_stream {
            return Err(Error::transport(format!(
                "{url} did not answer with an event stream"
            )));
        }

        let mut events = Sse::new(Chunks::from_response(response));
        let endpoint = loop {
            let event = events.next_event().await.map_err(|err| {
                Error::transport(format!("event stream failed: {err}"))
            })?;
            let Some(event) = event else {
                return Err(Error::transport(
                    "event stream closed before announcing the message endpoint",
                ));
            };
            if event.name() == "endpoint" {
                break url.join(event.data.trim()).map_err(|err| {
                    Error::protocol(format!(
                        "invalid message endpoint {:?}: {err}",
                        event.data
                    ))
                })?;
            }
        };
        debug!(%endpoint, "event stream connected");

        Ok(Self {
            client,
            endpoint,
            events,
        })
    }

    pub async fn request(
        &mut self,
        req: &Request<'_>,
    ) -> Result<RpcOutcome, Error> {
        self.post(req, req.method).await?;
        read_response(&mut self.events, req.id).await
    }

    pub async fn notify(
        &mut self,
        notification: &Notification<'_>,
    ) -> Result<(), Error> {
        self.post(notification, notification.method).await
    }

    async fn post<T: serde::Serialize>(
        &self,
        body: &T,
        method: &str,
    ) -> Result<(), Error> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| {
                Error::transport(format!("failed to post {method}: {err}"))
            })?;
        check_status(&response, method)
    }
}
