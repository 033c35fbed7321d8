//! A client for tool providers speaking the Model Context Protocol.
//!
//! Every operation runs in a session of its own: connect, initialize,
//! do the work, close. Sessions are never reused across operations.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod error;
mod proto;
mod session;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use mlbchat_model::{ResultFragment, ToolDescriptor};
use serde_json::Value;
use tokio::time::Instant;
use tracing::Instrument;

pub use config::*;
pub use error::*;

use crate::session::Session;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A tool provider endpoint.
#[derive(Clone, Debug)]
pub struct McpEndpoint {
    client: reqwest::Client,
    config: Arc<McpConfig>,
}

impl McpEndpoint {
    /// Creates an endpoint with a fresh HTTP client.
    #[inline]
    pub fn new(config: McpConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates an endpoint that sends requests with `client`.
    #[inline]
    pub fn with_client(client: reqwest::Client, config: McpConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this endpoint.
    #[inline]
    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    /// Lists the tools the endpoint offers.
    pub async fn fetch_catalog(&self) -> Result<Vec<ToolDescriptor>, Error> {
        let span = debug_span!("fetch catalog", url = %self.config.url);
        async {
            let deadline = Instant::now() + self.config.timeout;
            let mut session = self.open(deadline).await?;
            let result = self.bounded(deadline, session.list_tools()).await;
            close(session).await;
            result
        }
        .instrument(span)
        .await
    }

    /// Invokes the tool `name` with `arguments` and returns its result
    /// fragments.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<ResultFragment>, Error> {
        let span = debug_span!("invoke tool", name);
        async {
            let deadline = Instant::now() + self.config.timeout;
            let mut session = self.open(deadline).await?;
            let result = self
                .bounded(deadline, session.call_tool(name, arguments))
                .await;
            close(session).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn open(&self, deadline: Instant) -> Result<Session, Error> {
        let connect = Session::connect(&self.client, &self.config);
        let mut session = self.bounded(deadline, connect).await?;
        match self
            .bounded(deadline, session.initialize(&self.config))
            .await
        {
            Ok(()) => Ok(session),
            Err(err) => {
                close(session).await;
                Err(err)
            }
        }
    }

    async fn bounded<T>(
        &self,
        deadline: Instant,
        fut: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::transport(format!(
                "no answer within {}s",
                self.config.timeout.as_secs_f32()
            ))),
        }
    }
}

/// Closes `session`, waiting at most [`CLOSE_TIMEOUT`] for the server.
async fn close(session: Session) {
    if tokio::time::timeout(CLOSE_TIMEOUT, session.close())
        .await
        .is_err()
    {
        debug!("gave up closing the session");
    }
}
