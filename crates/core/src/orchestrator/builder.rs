use std::sync::Arc;
use std::time::Duration;

use mlbchat_model::ModelProvider;

use super::Orchestrator;
use crate::followup::{AlwaysContinue, FollowUpScript, ReplyClassifier};
use crate::model_client::ModelClient;
use crate::observer::{RunObserver, TracingObserver};
use crate::tool::{NoTools, ToolSource};

/// [`Orchestrator`] builder.
pub struct OrchestratorBuilder {
    model_client: ModelClient,
    tool_source: Arc<dyn ToolSource>,
    system_prompt: String,
    follow_ups: FollowUpScript,
    classifier: Arc<dyn ReplyClassifier>,
    observer: Arc<dyn RunObserver>,
    query_ceiling: u32,
    generation_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the specified model provider.
    ///
    /// Without further configuration, runs have no tools, no system
    /// prompt and no follow-ups, stop after 20 generation calls, and give
    /// the model 120 seconds per call.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tool_source: Arc::new(NoTools),
            system_prompt: String::new(),
            follow_ups: FollowUpScript::default(),
            classifier: Arc::new(AlwaysContinue),
            observer: Arc::new(TracingObserver),
            query_ceiling: 20,
            generation_timeout: Some(Duration::from_secs(120)),
            tool_timeout: None,
        }
    }

    /// Sets where tools come from.
    #[inline]
    pub fn with_tool_source<S: ToolSource + 'static>(
        mut self,
        source: S,
    ) -> Self {
        self.tool_source = Arc::new(source);
        self
    }

    /// Sets a shared tool source.
    #[inline]
    pub fn with_shared_tool_source(
        mut self,
        source: Arc<dyn ToolSource>,
    ) -> Self {
        self.tool_source = source;
        self
    }

    /// Sets the system prompt sent with every generation call.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the scripted follow-up prompts.
    #[inline]
    pub fn with_follow_ups(mut self, script: FollowUpScript) -> Self {
        self.follow_ups = script;
        self
    }

    /// Sets the classifier consulted before each follow-up.
    #[inline]
    pub fn with_classifier<C: ReplyClassifier + 'static>(
        mut self,
        classifier: C,
    ) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Sets the observer receiving run reports.
    #[inline]
    pub fn with_observer<O: RunObserver + 'static>(
        mut self,
        observer: O,
    ) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Sets the number of generation calls after which a run stops. The
    /// run stops once the count exceeds this value.
    #[inline]
    pub fn with_query_ceiling(mut self, ceiling: u32) -> Self {
        self.query_ceiling = ceiling;
        self
    }

    /// Sets the timeout of each generation call, or removes it.
    #[inline]
    pub fn with_generation_timeout(
        mut self,
        timeout: Option<Duration>,
    ) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Bounds catalog fetches and tool invocations.
    #[inline]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        let OrchestratorBuilder {
            mut model_client,
            tool_source,
            system_prompt,
            follow_ups,
            classifier,
            observer,
            query_ceiling,
            generation_timeout,
            tool_timeout,
        } = self;
        model_client.set_timeout(generation_timeout);

        Orchestrator {
            model_client,
            tool_source,
            system_prompt,
            follow_ups,
            classifier,
            observer,
            query_ceiling,
            tool_timeout,
        }
    }
}
