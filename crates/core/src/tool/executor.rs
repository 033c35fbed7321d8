use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mlbchat_model::{ResultFragment, ToolDescriptor, ToolUseRequest};
use tracing::Instrument;

use crate::tool::{Error, ToolSource};

/// What a tool request resolved to, ready to be appended as a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutcome {
    pub content: Vec<ResultFragment>,
    pub is_error: bool,
}

impl ToolOutcome {
    /// Renders a failure as a single text fragment the model can read.
    fn failure(err: &Error) -> Self {
        Self {
            content: vec![ResultFragment::text(format!(
                "Error: {}",
                err.reason()
            ))],
            is_error: true,
        }
    }
}

/// An executor that resolves tool requests against the catalog snapshot
/// of one run.
pub struct Executor {
    source: Arc<dyn ToolSource>,
    catalog: Vec<ToolDescriptor>,
    names: HashSet<String>,
    timeout: Option<Duration>,
}

impl Executor {
    /// Fetches the catalog once. It is never refreshed afterwards.
    pub async fn load(
        source: Arc<dyn ToolSource>,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        let fetched = bounded(timeout, source.fetch_catalog())
            .instrument(debug_span!("fetch catalog"))
            .await?;

        let mut names = HashSet::with_capacity(fetched.len());
        let mut catalog = Vec::with_capacity(fetched.len());
        for tool in fetched {
            if !names.insert(tool.name.clone()) {
                warn!("duplicate tool in catalog: {}", tool.name);
                continue;
            }
            catalog.push(tool);
        }

        Ok(Self {
            source,
            catalog,
            names,
            timeout,
        })
    }

    #[inline]
    pub fn catalog(&self) -> &[ToolDescriptor] {
        &self.catalog
    }

    /// Resolves one request. Failures are turned into an error outcome
    /// instead of being propagated.
    pub async fn execute(&self, req: &ToolUseRequest) -> ToolOutcome {
        let span = debug_span!("tool executor", name = %req.name, id = %req.id);
        async {
            let result = if self.names.contains(&req.name) {
                trace!("invoking with args: {:?}", req.input);
                bounded(
                    self.timeout,
                    self.source.invoke(&req.name, req.input.clone()),
                )
                .await
            } else {
                Err(Error::unknown_tool().with_reason(format!(
                    "{} is not an available tool",
                    req.name
                )))
            };

            match result {
                Ok(content) => ToolOutcome {
                    content,
                    is_error: false,
                },
                Err(err) => {
                    warn!("tool failed: {err}");
                    ToolOutcome::failure(&err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

async fn bounded<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    let Some(timeout) = timeout else {
        return fut.await;
    };
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout()
            .with_reason(format!("no answer within {timeout:?}"))),
    }
}
