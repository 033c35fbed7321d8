use mlbchat_sse::{Chunks, Sse};
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;

use super::{
    RpcOutcome, check_status, content_type, find_response, read_response,
};
use crate::error::Error;
use crate::proto::{Notification, Request};

const SESSION_ID_HEADER: &str = "mcp-session-id";

/// The streamable HTTP transport.
///
/// Every client message is posted to the endpoint. The server answers
/// a request either with a JSON body or with an event stream that
/// eventually carries the response.
pub(crate) struct HttpTransport {
    client: Client,
    url: Url,
    session_id: Option<HeaderValue>,
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        // Abandoned mid-operation, e.g. by a timeout around the caller.
        let Some(session_id) = self.session_id.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                debug!("terminating an abandoned session");
                handle.spawn(terminate(
                    self.client.clone(),
                    self.url.clone(),
                    session_id,
                ));
            }
            Err(_) => warn!("no runtime to terminate an abandoned session"),
        }
    }
}

impl HttpTransport {
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            session_id: None,
        }
    }

    pub async fn request(
        &mut self,
        req: &Request<'_>,
    ) -> Result<RpcOutcome, Error> {
        let response = self.post(req, req.method).await?;

        let Some(kind) = content_type(&response) else {
            return Err(Error::protocol(format!(
                "{} answered without a content type",
                req.method
            )));
        };
        if kind.essence_str() == mime::TEXT_EVENT_STREAM.essence_str() {
            let mut events = Sse::new(Chunks::from_response(response));
            return read_response(&mut events, req.id).await;
        }
        if kind.essence_str() != mime::APPLICATION_JSON.essence_str() {
            return Err(Error::protocol(format!(
                "{} answered with unexpected content type {kind}",
                req.method
            )));
        }

        let payload: Value = response.json().await.map_err(|err| {
            Error::protocol(format!("invalid JSON-RPC message: {err}"))
        })?;
        find_response(payload, req.id)?.ok_or_else(|| {
            Error::protocol(format!(
                "{} answered without a matching response",
                req.method
            ))
        })
    }

    pub async fn notify(
        &mut self,
        notification: &Notification<'_>,
    ) -> Result<(), Error> {
        self.post(notification, notification.method).await?;
        Ok(())
    }

    /// Terminates the server-side session, if one was assigned.
    pub async fn close(mut self) {
        if let Some(session_id) = self.session_id.take() {
            terminate(self.client.clone(), self.url.clone(), session_id)
                .await;
        }
    }

    async fn post<T: Serialize>(
        &mut self,
        body: &T,
        method: &str,
    ) -> Result<Response, Error> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session_id) = &self.session_id {
            builder = builder.header(SESSION_ID_HEADER, session_id.clone());
        }
        let response = builder.send().await.map_err(|err| {
            Error::transport(format!("failed to post {method}: {err}"))
        })?;
        check_status(&response, method)?;

        if let Some(session_id) = response.headers().get(SESSION_ID_HEADER) {
            self.session_id = Some(session_id.clone());
        }
        Ok(response)
    }
}

async fn terminate(client: Client, url: Url, session_id: HeaderValue) {
    let result = client
        .delete(url)
        .header(SESSION_ID_HEADER, session_id)
        .send()
        .await;
    if let Err(err) = result {
        debug!("failed to terminate session: {err}");
    }
}
