use std::time::Duration;

/// How messages travel between the client and the tool provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// The legacy HTTP+SSE transport: a long-lived event stream for
    /// server messages and a separate URL for client messages.
    #[default]
    Sse,
    /// The streamable HTTP transport: every client message is a POST whose
    /// response carries the answer.
    StreamableHttp,
}

/// Builder for [`McpConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct McpConfigBuilder {
    url: String,
    transport: TransportKind,
    timeout: Option<Duration>,
    client_name: Option<String>,
    client_version: Option<String>,
}

impl McpConfigBuilder {
    /// Creates a builder for the endpoint at `url`.
    #[inline]
    pub fn with_url<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            transport: TransportKind::default(),
            timeout: None,
            client_name: None,
            client_version: None,
        }
    }

    /// Sets the transport.
    #[inline]
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Bounds every catalog fetch and tool call, session setup included.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the client name and version announced during initialization.
    #[inline]
    pub fn with_client_info<N: Into<String>, V: Into<String>>(
        mut self,
        name: N,
        version: V,
    ) -> Self {
        self.client_name = Some(name.into());
        self.client_version = Some(version.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> McpConfig {
        McpConfig {
            url: self.url,
            transport: self.transport,
            timeout: self.timeout.unwrap_or(Duration::from_secs(60)),
            client_name: self
                .client_name
                .unwrap_or_else(|| "mlbchat".to_owned()),
            client_version: self
                .client_version
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_owned()),
        }
    }
}

/// Configuration of one tool provider endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct McpConfig {
    pub(crate) url: String,
    pub(crate) transport: TransportKind,
    pub(crate) timeout: Duration,
    pub(crate) client_name: String,
    pub(crate) client_version: String,
}

impl McpConfig {
    /// Returns the endpoint URL.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the transport.
    #[inline]
    pub fn transport(&self) -> TransportKind {
        self.transport
    }
}
